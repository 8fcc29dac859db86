//! # Gatewayエンドポイント
//!
//! 4つのハンドラはそれぞれ独立しており、状態を持たない。

pub mod generate;
pub mod initiate;
pub mod presign_part;
pub mod complete;

#[cfg(test)]
mod test_helpers;

pub use complete::handle_complete_multipart;
pub use generate::handle_generate;
pub use initiate::handle_initiate_multipart;
pub use presign_part::handle_presign_part;

/// 空文字列のパラメータを未指定として扱う。
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
