//! Translates configuration entries into [`DisallowedCall`] rules.

use crate::rules::keyed::OrderedMap;
use crate::rules::model::{DisallowedCall, DisallowedCallConfig};
use crate::rules::normalize::normalize_call;
use crate::rules::params::{ParamId, ParamMatcher, ParamMatchers, ParamValue};
use disallowed_errors::{usage, ErrorCode, RuleResult};

/// Stateless translator from configuration entries to rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisallowedCallFactory;

impl DisallowedCallFactory {
    pub fn new() -> Self {
        DisallowedCallFactory
    }

    /// Build one rule per distinct normalised call name.
    ///
    /// A later entry with an already seen name replaces the earlier rule but
    /// keeps its position in the output. The first entry without a call name
    /// aborts the whole translation.
    pub fn create_from_config(
        &self,
        config: &[DisallowedCallConfig],
    ) -> RuleResult<Vec<DisallowedCall>> {
        let mut calls: OrderedMap<String, DisallowedCall> = OrderedMap::new();
        for (idx, entry) in config.iter().enumerate() {
            let call =
                create_call(entry).map_err(|err| err.with_context("entry", idx.to_string()))?;
            calls.insert(call.call.clone(), call);
        }
        Ok(calls.into_values())
    }
}

/// Shorthand for [`DisallowedCallFactory::create_from_config`].
pub fn translate(config: &[DisallowedCallConfig]) -> RuleResult<Vec<DisallowedCall>> {
    DisallowedCallFactory::new().create_from_config(config)
}

fn create_call(entry: &DisallowedCallConfig) -> RuleResult<DisallowedCall> {
    let call = entry.call_name().ok_or_else(|| {
        usage!(
            ErrorCode::MissingCallName,
            "either 'method' or 'function' must be set in configuration items"
        )
    })?;

    let allow_in_calls: Vec<String> = entry
        .allow_in_functions
        .as_ref()
        .or(entry.allow_in_methods.as_ref())
        .map(|calls| calls.iter().map(|call| normalize_call(call)).collect())
        .unwrap_or_default();

    let mut allow_params_in_allowed = ParamMatchers::new();
    add_values(
        &mut allow_params_in_allowed,
        entry.allow_params_in_allowed.as_ref(),
        ParamMatcher::ExactValue,
    );
    add_any_values(
        &mut allow_params_in_allowed,
        entry.allow_params_in_allowed_any_value.as_deref(),
    );

    let mut allow_params_anywhere = ParamMatchers::new();
    add_values(
        &mut allow_params_anywhere,
        entry.allow_params_anywhere.as_ref(),
        ParamMatcher::ExactValue,
    );
    add_any_values(
        &mut allow_params_anywhere,
        entry.allow_params_anywhere_any_value.as_deref(),
    );

    let mut allow_except_params = ParamMatchers::new();
    add_values(
        &mut allow_except_params,
        entry.allow_except_params.as_ref(),
        ParamMatcher::ExactValue,
    );
    add_values(
        &mut allow_except_params,
        entry.allow_except_case_insensitive_params.as_ref(),
        ParamMatcher::CaseInsensitiveValue,
    );

    Ok(DisallowedCall {
        call: normalize_call(call),
        message: entry.message.clone(),
        allow_in: entry.allow_in.clone().unwrap_or_default(),
        allow_in_calls,
        allow_params_in_allowed,
        allow_params_anywhere,
        allow_except_params,
    })
}

fn add_values(
    target: &mut ParamMatchers,
    values: Option<&OrderedMap<ParamId, ParamValue>>,
    matcher: fn(ParamValue) -> ParamMatcher,
) {
    let Some(values) = values else {
        return;
    };
    for (param, value) in values.iter() {
        target.insert(param.clone(), matcher(value.clone()));
    }
}

fn add_any_values(target: &mut ParamMatchers, params: Option<&[ParamId]>) {
    for param in params.unwrap_or_default() {
        target.insert(param.clone(), ParamMatcher::AnyValue);
    }
}
