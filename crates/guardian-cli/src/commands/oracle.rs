//! One-shot oracle calls. Failures never surface as errors: the output is
//! the same safe default the session would use.

use guardian_core::oracle::{assess_or_default, guidance_or_fallback, havens_or_empty};
use guardian_core::Config;
use serde_json::json;

use super::{async_runtime, oracles};

pub fn assess(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let oracles = oracles(&Config::load()?);
    let assessment = async_runtime()?.block_on(assess_or_default(oracles.assessor.as_ref(), text));
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

pub fn guidance(situation: &str, location: &str) -> Result<(), Box<dyn std::error::Error>> {
    let oracles = oracles(&Config::load()?);
    let tips = async_runtime()?.block_on(guidance_or_fallback(
        oracles.guidance.as_ref(),
        location,
        situation,
    ));
    println!("{}", serde_json::to_string_pretty(&json!({ "tips": tips }))?);
    Ok(())
}

pub fn havens(lat: f64, lng: f64) -> Result<(), Box<dyn std::error::Error>> {
    let oracles = oracles(&Config::load()?);
    let havens = async_runtime()?.block_on(havens_or_empty(oracles.havens.as_ref(), lat, lng));
    println!("{}", serde_json::to_string_pretty(&havens)?);
    Ok(())
}
