//! Helpers shared by the codec and protocol modules.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// Like `assert!`, but for checks on untrusted input that must turn into an
/// error instead of a panic.
///
/// ```ignore
/// ensure!(header_end <= MAX_HEADER_BYTES, ParseError::too_large_header(header_end, MAX_HEADER_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
