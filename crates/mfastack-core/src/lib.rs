//! mfastack core
//!
//! スタック定義（ユーザープール、クライアント、ネットワーク、ロードバランサー）の
//! モデル、KDLパーサー、テンプレート展開、プロジェクトローダーを提供します。

pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod presets;
pub mod template;

pub use discovery::{DiscoveredFiles, discover_files, discover_files_with_stage, find_project_root};
pub use error::{Result, StackError};
pub use loader::{
    LoadedProject, load_project, load_project_from_root, load_project_from_root_with_stage,
};
pub use model::*;
pub use parser::{apply_kdl_string, parse_kdl_string};
pub use presets::Variant;
pub use template::{TemplateProcessor, Variables, extract_variables};
