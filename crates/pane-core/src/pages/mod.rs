//! Pages and the scheduler that rotates them.

pub mod constants;
pub mod header;
pub mod notice;
pub mod now_playing;
pub mod page;
pub mod remote;
pub mod scheduler;

pub use header::{HeaderForm, HeaderOverlay, HeaderState};
pub use notice::NoticePage;
pub use now_playing::{NowPlayingPage, Track};
pub use page::{Capabilities, HeaderTheme, Page, PageContext, PageError, PageName, PageWrapper};
pub use remote::RemotePage;
pub use scheduler::{PageScheduler, SchedulerConfig, SchedulerError, TickOutcome};
