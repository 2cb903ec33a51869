use serde::de::DeserializeOwned;

use crate::error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Deserializes an operator's parameter object, naming the operator in the
/// error
pub fn parse_params<T>(op_type: &str, params: &serde_json::Value) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(params.clone()).map_err(|source| Error::InvalidOperatorParams {
        op_type: op_type.to_string(),
        source,
    })
}
