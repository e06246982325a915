//! 游戏逻辑模块
//!
//! 管理对局会话、选子交互、走法校验与快照合并

mod input;
mod reconcile;
mod session;
mod state;
mod validator;

pub use input::*;
pub use reconcile::*;
pub use session::*;
pub use state::*;
pub use validator::*;
