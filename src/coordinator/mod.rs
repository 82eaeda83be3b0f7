mod barrier;
mod completion;
mod coordinator;

use barrier::{Barrier, BarrierState};
use completion::{Completion, Signal};

pub(crate) use coordinator::Coordinator;
