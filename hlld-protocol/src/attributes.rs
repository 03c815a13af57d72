//! Set creation attributes.

/// Smallest precision the server accepts.
pub const MIN_PRECISION: i32 = 4;

/// Largest precision the server accepts.
pub const MAX_PRECISION: i32 = 18;

/// Optional properties of a new counting set, sent with `create`.
///
/// Values outside the accepted ranges are not rejected; they are left out of
/// the command so the server falls back to its own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetAttributes {
    /// Register precision, emitted only when within 4..=18.
    pub precision: i32,
    /// Target error bound, emitted only when non-zero.
    pub error_bound: f64,
    /// Keep the set in memory only.
    pub in_memory: bool,
}

impl SetAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_error_bound(mut self, error_bound: f64) -> Self {
        self.error_bound = error_bound;
        self
    }

    pub fn with_in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Renders the attributes as `create` arguments.
    ///
    /// Order is fixed: `precision=`, `eps=`, `in_memory=1`. The error bound is
    /// printed in fixed-point with six decimals, never in exponent form.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if (MIN_PRECISION..=MAX_PRECISION).contains(&self.precision) {
            args.push(format!("precision={}", self.precision));
        }
        if self.error_bound != 0.0 {
            args.push(format!("eps={:.6}", self.error_bound));
        }
        if self.in_memory {
            args.push("in_memory=1".to_string());
        }
        args
    }

    /// Returns true if no argument would be emitted.
    pub fn is_empty(&self) -> bool {
        self.to_args().is_empty()
    }
}
