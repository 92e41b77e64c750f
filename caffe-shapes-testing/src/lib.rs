//! Internal testing utilities for caffe-shapes.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Runs a table of shape inference test cases, reporting every failing case
/// instead of stopping at the first one.
///
/// Conventionally each test declares a `Case` struct holding the inputs and
/// expected output for one row of the table, collects the rows into an array
/// named `cases` and calls `cases.test_each` with the test body.
///
/// ```
/// use caffe_shapes_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     input: usize,
///     kernel: usize,
///     stride: usize,
///     expected: usize,
/// }
///
/// let cases = [
///     Case { input: 10, kernel: 3, stride: 1, expected: 8 },
///     Case { input: 8, kernel: 2, stride: 2, expected: 4 },
/// ];
///
/// cases.test_each(|case| {
///     let out = (case.input - case.kernel) / case.stride + 1;
///     assert_eq!(out, case.expected);
/// });
/// ```
///
/// Cases and any values captured by the test closure must be unwind safe,
/// because each case runs inside [`std::panic::catch_unwind`]. Wrap offending
/// values with [`AssertUnwindSafe`](std::panic::AssertUnwindSafe), or build
/// them inside the closure instead.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Call `test` with a reference to each case, catching panics.
    ///
    /// Panics after all cases have run if any of them failed, with the debug
    /// representation of each failing case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Variant of [`test_each`](TestCases::test_each) which passes an owned
    /// clone of each case to `test`.
    fn test_each_clone(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe;
}

fn report_failures<T: Debug>(failures: &[T]) {
    assert_eq!(
        failures.len(),
        0,
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let failures: Vec<_> = self
            .into_iter()
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .collect();
        report_failures(&failures);
    }

    fn test_each_clone(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe,
    {
        let mut failures = Vec::new();
        for case in self {
            let value = case.clone();
            let test = &test;
            if std::panic::catch_unwind(move || test(value)).is_err() {
                failures.push(case);
            }
        }
        report_failures(&failures);
    }
}
