/// パスワードの保存形式と照合方法を切り替えるための境界。
/// ルート側はこのトレイト経由でのみパスワードを扱う。
pub trait CredentialPolicy: Send + Sync {
    /// 保存用の表現に変換する
    fn seal(&self, raw: &str) -> String;

    /// 保存済みの値と入力値を照合する
    fn verify(&self, stored: &str, supplied: &str) -> bool;
}

/// 平文のまま保存し、バイト単位で比較する。
///
/// 既存クライアントとの互換のための実装で、安全ではない。
/// ハッシュ化する実装に差し替えること。
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCredentials;

impl CredentialPolicy for PlaintextCredentials {
    fn seal(&self, raw: &str) -> String {
        raw.to_string()
    }

    fn verify(&self, stored: &str, supplied: &str) -> bool {
        stored.as_bytes() == supplied.as_bytes()
    }
}
