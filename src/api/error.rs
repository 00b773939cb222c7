// ==========================================
// 传单配布调度系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Engine错误为带原因的业务错误
// 约定: 校验错误在任何写入之前检出；持久化错误整体回滚
// ==========================================

use crate::engine::allocation::AllocationViolation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 落位校验错误
    // ==========================================
    #[error("区域不一致: 传单区域={candidate_area_id}, 计划区域={schedule_area_id}")]
    AreaMismatch {
        candidate_area_id: i64,
        schedule_area_id: i64,
    },

    #[error("传单重复: flyer_id={flyer_id}, 已有分配={existing_item_id}")]
    DuplicateFlyer {
        flyer_id: i64,
        existing_item_id: String,
        matched_code: Option<String>,
    },

    #[error("槽位已占用: slot_index={slot_index}, 已有分配={existing_item_id}")]
    SlotOccupied {
        slot_index: u8,
        existing_item_id: String,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为校验类错误（未发生任何写入）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::AreaMismatch { .. }
                | ApiError::DuplicateFlyer { .. }
                | ApiError::SlotOccupied { .. }
                | ApiError::InvalidInput(_)
                | ApiError::NotFound(_)
                | ApiError::ValidationError(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationViolation 转换
// ==========================================
impl From<AllocationViolation> for ApiError {
    fn from(v: AllocationViolation) -> Self {
        match v {
            AllocationViolation::AreaMismatch {
                candidate_area_id,
                schedule_area_id,
            } => ApiError::AreaMismatch {
                candidate_area_id,
                schedule_area_id,
            },
            AllocationViolation::DuplicateFlyer {
                flyer_id,
                existing_item_id,
                matched_code,
            } => ApiError::DuplicateFlyer {
                flyer_id,
                existing_item_id,
                matched_code,
            },
            AllocationViolation::SlotOccupied {
                slot_index,
                existing_item_id,
            } => ApiError::SlotOccupied {
                slot_index,
                existing_item_id,
            },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Schedule".to_string(),
            id: "S001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Schedule"));
                assert!(msg.contains("S001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
        assert!(!api_err.is_validation());
    }

    #[test]
    fn test_violation_conversion_keeps_reason() {
        let api_err: ApiError = AllocationViolation::SlotOccupied {
            slot_index: 3,
            existing_item_id: "I9".to_string(),
        }
        .into();
        assert!(api_err.is_validation());
        assert!(api_err.to_string().contains("slot_index=3"));
    }
}
