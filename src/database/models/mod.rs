pub mod household;
pub mod level;
pub mod member;
pub mod task;
pub mod user;

pub use household::{Household, NewHousehold};
pub use level::{LevelState, ScoreEntry};
pub use member::{Member, MemberChanges, NewMember};
pub use task::{NewTask, Task, TaskOverview};
pub use user::{AccountHousehold, NewUser, User};
