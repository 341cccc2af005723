//! Dispatch identifiers.
//!
//! # ULID ベースの ID
//! 1 回の dispatch（submit から最終的な配送まで）を識別します。
//! ULID は生成順でソートできるので、ログを時系列で追うときの相関キーとして使います。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of one dispatch.
///
/// Display は `dispatch-` プレフィックス付き（例: `dispatch-01HV...`）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DispatchId(Ulid);

impl DispatchId {
    /// 新しい DispatchId を生成
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// ULID から DispatchId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for DispatchId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch-{}", self.0)
    }
}
