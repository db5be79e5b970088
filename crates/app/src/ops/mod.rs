pub mod identity;
pub mod init;
pub mod inspect;
pub mod share;
pub mod version;
pub mod view;

pub use identity::Identity;
pub use init::Init;
pub use inspect::Inspect;
pub use share::Share;
pub use version::Version;
pub use view::View;
