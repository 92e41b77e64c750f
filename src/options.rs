use std::env;

use serde::Deserialize;

/// Name of the environment variable read by [`InferOptions::from_env`].
pub const OPTIONS_ENV_VAR: &str = "CAFFE_SHAPES_OPTS";

/// How concatenation treats inputs whose non-concatenated axes differ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcatCheck {
    /// Fail with [`IncompatibleShapes`](crate::ShapeErrorKind::IncompatibleShapes).
    #[default]
    Strict,

    /// Sum the concatenated axis and take every other axis from the first
    /// input, without comparing them.
    Accumulate,
}

/// How a reshape infers a `-1` target dim when the input size is not a
/// multiple of the product of the other target dims.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReshapeDivision {
    /// Fail with [`DimensionUndeterminable`](crate::ShapeErrorKind::DimensionUndeterminable).
    #[default]
    Exact,

    /// Round the inferred size down.
    Truncate,
}

/// Options which control edge-case behavior of shape inference.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct InferOptions {
    pub concat_check: ConcatCheck,
    pub reshape_division: ReshapeDivision,
}

impl InferOptions {
    /// Parse options from a JSON object, eg. `{"concat-check": "accumulate"}`.
    ///
    /// Fields which are not present keep their default values.
    pub fn from_json(json: &str) -> Result<InferOptions, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Return the default options, updated from the `CAFFE_SHAPES_OPTS`
    /// environment variable if set.
    pub fn from_env() -> InferOptions {
        let mut opts = InferOptions::default();
        if let Some(config) = env::var_os(OPTIONS_ENV_VAR) {
            parse_options(&config.to_string_lossy(), &mut opts);
        }
        opts
    }
}

/// Update `opts` from a space-separated sequence of `key=value` pairs.
///
/// Unrecognized keys and values are logged and skipped.
fn parse_options(config: &str, opts: &mut InferOptions) {
    for token in config.split_ascii_whitespace() {
        let Some((key, val)) = token.split_once('=') else {
            log::warn!("Ignoring option \"{}\" with no value", token);
            continue;
        };
        let (key, val) = (key.trim(), val.trim());

        match key {
            "concat-check" => match val {
                "strict" => opts.concat_check = ConcatCheck::Strict,
                "accumulate" => opts.concat_check = ConcatCheck::Accumulate,
                _ => log::warn!("Unrecognized concat check \"{}\"", val),
            },
            "reshape-division" => match val {
                "exact" => opts.reshape_division = ReshapeDivision::Exact,
                "truncate" => opts.reshape_division = ReshapeDivision::Truncate,
                _ => log::warn!("Unrecognized reshape division \"{}\"", val),
            },
            _ => log::warn!("Unrecognized shape inference option \"{}\"", key),
        }
    }
}
