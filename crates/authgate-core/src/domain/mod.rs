//! 인증 도메인 모델.
//!
//! - [`Role`], [`RoleSet`]: 역할 및 역할 집합
//! - [`Identity`]: 인증 가능한 사용자 신원
//! - [`IdentityStore`], [`TokenRegistry`]: 외부 데이터 접근 협력자
//! - [`MemoryIdentityStore`], [`MemoryTokenRegistry`]: 인메모리 구현

mod identity;
mod memory;
mod role;
mod store;
mod token;

pub use identity::Identity;
pub use memory::{MemoryIdentityStore, MemoryTokenRegistry};
pub use role::{parse_role_list, Role, RoleSet};
pub use store::{IdentityStore, TokenRegistry};
pub use token::{fingerprint, TokenKind, TokenRecord};
