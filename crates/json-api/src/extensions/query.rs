//! Query parameter parsing.

use std::{fmt::Display, str::FromStr};

use salvo::{oapi::extract::QueryParam, prelude::StatusError};

use super::result::ResultExt as _;

pub(crate) trait QueryParamExt {
    /// Parse an optional query parameter, rejecting values that do not parse.
    fn parse_or_400<T>(self, name: &str) -> Result<Option<T>, StatusError>
    where
        T: FromStr,
        T::Err: Display;
}

impl QueryParamExt for QueryParam<String, false> {
    fn parse_or_400<T>(self, name: &str) -> Result<Option<T>, StatusError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.into_inner()
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<T>())
            .transpose()
            .or_400(&format!("could not parse \"{name}\" query parameter"))
    }
}
