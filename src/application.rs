// アプリケーション層
// ユースケースの実行順序を制御し、ドメイン層とアダプター層を仲介する

pub mod error;
pub mod service;

pub use error::ApplicationError;
