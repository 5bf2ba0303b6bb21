pub use derivative::Derivative;
pub use parking_lot::{Condvar, Mutex};
pub use std::{
    cmp::{self, Ordering},
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Display},
    hash::Hash,
    iter,
    mem,
    ops::Deref,
    slice,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
};
