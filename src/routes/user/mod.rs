mod handler;
mod model;
mod session;

pub use handler::{home, sign_in, sign_out, sign_up};
pub use model::{
    NewUser, PgUserRepository, RepositoryError, SessionUser, SignInRequest, SignUpRequest, User,
    UserRepository,
};
pub use session::{session_user, set_session_user};
