use thiserror::Error;

/// Errors for the config module.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The config file could not be read or parsed.
    #[error("invalid configuration file `{file}` - {message}")]
    InvalidConfig { file: String, message: String },

    /// A field failed validation after defaults were filled in.
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },

    /// A degradation level referenced an action outside the closed set.
    #[error("level '{level_id}' references unknown action '{action}'")]
    UnknownAction { level_id: String, action: String },

    /// `levels` was empty.
    #[error("ADM configuration must declare at least one level")]
    EmptyLevels,
}
