//! KDLノードの値取得ヘルパー

use crate::error::{Result, StackError};
use kdl::{KdlNode, KdlValue};
use tracing::warn;

/// 位置引数（名前なしエントリ）を列挙
fn arguments(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

/// プロパティ（key=value）を取得
fn property<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .map(|e| e.value())
}

/// 最初の位置引数を文字列として取得
pub fn first_string(node: &KdlNode) -> Option<String> {
    arguments(node)
        .next()
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// 全ての文字列位置引数を取得
pub fn string_args(node: &KdlNode) -> Vec<String> {
    arguments(node)
        .filter_map(|v| v.as_string().map(|s| s.to_string()))
        .collect()
}

/// ノード名となる最初の引数（必須）
pub fn required_name(node: &KdlNode, kind: &str) -> Result<String> {
    first_string(node).ok_or_else(|| StackError::InvalidConfig(format!("{} requires a name", kind)))
}

/// 真偽値に変換
///
/// 文字列 "true"/"false" も受け付ける（警告を出す）
fn value_to_bool(node: &KdlNode, value: &KdlValue) -> Result<bool> {
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    match value.as_string() {
        Some("true") => {
            warn!(node = %node.name().value(), "String \"true\" used for boolean, prefer #true");
            Ok(true)
        }
        Some("false") => {
            warn!(node = %node.name().value(), "String \"false\" used for boolean, prefer #false");
            Ok(false)
        }
        _ => Err(StackError::InvalidConfig(format!(
            "{}: 真偽値が必要です (#true / #false)",
            node.name().value()
        ))),
    }
}

/// フラグノードの値
///
/// `self-sign-up` のように引数がない場合は true とみなす
pub fn flag(node: &KdlNode) -> Result<bool> {
    match arguments(node).next() {
        Some(value) => value_to_bool(node, value),
        None => Ok(true),
    }
}

/// 真偽値プロパティ
pub fn bool_prop(node: &KdlNode, key: &str) -> Result<Option<bool>> {
    property(node, key)
        .map(|value| value_to_bool(node, value))
        .transpose()
}

/// 最初の位置引数を整数として取得（範囲チェック付き）
pub fn first_integer<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    let value = arguments(node).next().and_then(|v| v.as_integer());
    to_integer(node, value)
}

/// 整数プロパティ
pub fn integer_prop<T: TryFrom<i128>>(node: &KdlNode, key: &str) -> Result<Option<T>> {
    match property(node, key) {
        Some(value) => to_integer(node, value.as_integer()).map(Some),
        None => Ok(None),
    }
}

fn to_integer<T: TryFrom<i128>>(node: &KdlNode, value: Option<i128>) -> Result<T> {
    value
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| {
            StackError::InvalidConfig(format!(
                "{}: 範囲内の整数が必要です",
                node.name().value()
            ))
        })
}

/// 文字列プロパティ
pub fn string_prop(node: &KdlNode, key: &str) -> Option<String> {
    property(node, key)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// 列挙値をパースし、失敗時は設定エラーにする
pub fn parse_enum<T>(node: &KdlNode, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    let raw = first_string(node).ok_or_else(|| {
        StackError::InvalidConfig(format!("{}: 値が指定されていません", node.name().value()))
    })?;
    parse(&raw).ok_or_else(|| {
        StackError::InvalidConfig(format!("{}: 不明な値 '{}'", node.name().value(), raw))
    })
}

/// ノード名を kebab-case に正規化
pub fn normalized_name(node: &KdlNode) -> String {
    node.name().value().replace('_', "-")
}
