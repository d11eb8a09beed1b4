//! Gateway types
//!
//! - [`money`]: `StrictDecimal` input amounts, `DisplayAmount` output amounts
//! - [`response`]: `ApiResponse<T>` envelope, pagination, error codes

pub mod money;
pub mod response;

pub use money::{DisplayAmount, StrictDecimal};
pub use response::{
    ApiResponse, ApiResult, CreatedResult, Paginated, Pagination, created, error_codes, ok,
};
