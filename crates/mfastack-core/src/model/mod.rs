//! モデル定義
//!
//! スタック定義で使用されるデータモデルを定義します。
//! 各モデルはリソースごとにモジュールに分離されています。

mod client;
mod load_balancer;
mod network;
mod stack;
mod url;
mod user_pool;

// Re-exports
pub use client::*;
pub use load_balancer::*;
pub use network::*;
pub use stack::*;
pub use url::*;
pub use user_pool::*;
