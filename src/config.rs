use crate::common::*;

/// Parallel execution configuration of a [Stream](crate::Stream).
///
/// It accepts the following values through [From] conversions.
///
/// - `None`: default page size (a quarter of the input) and one task per processor.
/// - `10` or non-zero integers: at most 10 concurrent tasks.
/// - `2.5` or non-zero floating points: at most 2.5 times the system processors.
/// - `(64, 10)`: page size 64 and at most 10 concurrent tasks.
#[derive(Debug, Clone, Default)]
pub struct ParConfig {
    pub page_size: PageSize,
    pub max_tasks: Count,
}

impl ParConfig {
    /// Resolves the configuration against an input of `len` elements.
    pub fn params(&self, len: usize) -> ParParams {
        ParParams {
            page_size: self.page_size.resolve(len),
            max_tasks: self.max_tasks.to_absolute(),
        }
    }
}

impl From<Option<usize>> for ParConfig {
    fn from(max_tasks: Option<usize>) -> Self {
        match max_tasks {
            Some(max_tasks) => max_tasks.into(),
            None => Self::default(),
        }
    }
}

impl From<usize> for ParConfig {
    fn from(max_tasks: usize) -> Self {
        ParConfig {
            page_size: PageSize::default(),
            max_tasks: max_tasks.into(),
        }
    }
}

impl From<f64> for ParConfig {
    fn from(scale: f64) -> Self {
        ParConfig {
            page_size: PageSize::default(),
            max_tasks: scale.into(),
        }
    }
}

impl From<(usize, usize)> for ParConfig {
    fn from((page_size, max_tasks): (usize, usize)) -> Self {
        ParConfig {
            page_size: page_size.into(),
            max_tasks: max_tasks.into(),
        }
    }
}

impl From<(usize, f64)> for ParConfig {
    fn from((page_size, max_tasks): (usize, f64)) -> Self {
        ParConfig {
            page_size: page_size.into(),
            max_tasks: max_tasks.into(),
        }
    }
}

/// Sum type of absolute value and scaling value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Count {
    /// The number of system processors.
    #[default]
    Auto,
    Absolute(usize),
    Scale(f64),
}

impl Count {
    /// Resolves to a positive number. Zero and non-positive scales fall back to [Count::Auto].
    pub fn to_absolute(&self) -> usize {
        match *self {
            Self::Auto => *DEFAULT_MAX_TASKS,
            Self::Absolute(0) => *DEFAULT_MAX_TASKS,
            Self::Absolute(val) => val,
            Self::Scale(scale) if scale.is_finite() && scale > 0.0 => {
                cmp::max((*DEFAULT_MAX_TASKS as f64 * scale).ceil() as usize, 1)
            }
            Self::Scale(_) => *DEFAULT_MAX_TASKS,
        }
    }
}

impl From<usize> for Count {
    fn from(val: usize) -> Self {
        Count::Absolute(val)
    }
}

impl From<f64> for Count {
    fn from(scale: f64) -> Self {
        Count::Scale(scale)
    }
}

impl From<Option<usize>> for Count {
    fn from(val: Option<usize>) -> Self {
        val.map(Count::Absolute).unwrap_or_default()
    }
}

static DEFAULT_MAX_TASKS: once_cell::sync::Lazy<usize> =
    once_cell::sync::Lazy::new(|| cmp::max(num_cpus::get(), 1));

/// Page size policy, evaluated against the input length each time a stage runs.
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub enum PageSize {
    /// A quarter of the input length.
    #[default]
    Quarter,
    Fixed(usize),
    Fn(#[derivative(Debug = "ignore")] Arc<dyn Fn(usize) -> usize + Send + Sync>),
}

impl PageSize {
    /// Creates a page size computed from the input length by `f`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: 'static + Fn(usize) -> usize + Send + Sync,
    {
        Self::Fn(Arc::new(f))
    }

    /// Returns the page size for `len` elements, never less than 1.
    pub fn resolve(&self, len: usize) -> usize {
        let size = match self {
            Self::Quarter => len >> 2,
            Self::Fixed(size) => *size,
            Self::Fn(f) => f(len),
        };
        cmp::max(size, 1)
    }
}

impl From<usize> for PageSize {
    fn from(size: usize) -> Self {
        PageSize::Fixed(size)
    }
}

/// Parallel parameters resolved for a concrete input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParParams {
    pub page_size: usize,
    pub max_tasks: usize,
}
