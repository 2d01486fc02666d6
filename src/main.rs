#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use config::Config;
use powerocean_rs::diff::{self, Difference};
use powerocean_rs::{Engine, EndpointMap, VariantRegistry};
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use server::error::ServiceError;
use server::{source, StateData};

use std::collections::BTreeMap;
use std::path::PathBuf;

mod metrics;
mod server;

#[derive(Clone, serde::Deserialize)]
pub struct PowerOceanConfig {
    serial: String,
    variant: String,
    document: String,
    variants_dir: Option<String>,
    reference: Option<String>,
    interval: u64,
}

pub fn read_settings() -> Result<PowerOceanConfig, config::ConfigError> {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("PO"))?
        .set_default("variant", "83")?
        .set_default("document", "response.json")?
        .set_default("interval", 10i64)?;

    settings.try_into()
}

#[derive(serde::Serialize)]
struct DiffReport {
    reference_keys: usize,
    current_keys: usize,
    differences: BTreeMap<String, Difference>,
}

#[get("/endpoints")]
async fn endpoints_route(state: &State<StateData>) -> Result<Json<EndpointMap>, ServiceError> {
    let extraction = state.refresh().await?;
    Ok(Json(extraction.endpoints.clone()))
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, ServiceError> {
    state.refresh().await?;
    metrics::read()
}

#[get("/diff?<values>")]
async fn diff_route(
    state: &State<StateData>,
    values: Option<bool>,
) -> Result<Json<DiffReport>, ServiceError> {
    let reference = state.reference.as_ref().ok_or(ServiceError::NoReference)?;
    let old = source::read_document(reference).await?;
    let new = source::read_document(&state.document).await?;

    Ok(Json(DiffReport {
        reference_keys: diff::count_keys(&old),
        current_keys: diff::count_keys(&new),
        differences: diff::compare(&old, &new, values.unwrap_or(false)),
    }))
}

fn exit_with(message: &str, error: &dyn std::fmt::Display) -> ! {
    log::error!("{}: {}", message, error);
    std::process::exit(1)
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = read_settings().unwrap_or_else(|e| exit_with("Configuration error", &e));

    let registry = match &settings.variants_dir {
        Some(dir) => VariantRegistry::with_dir(dir),
        None => VariantRegistry::builtin(),
    };
    let schema = registry
        .get(&settings.variant)
        .unwrap_or_else(|e| exit_with("Variant error", &e));

    log::info!(
        "serving {} (variant {}) from {}",
        settings.serial,
        settings.variant,
        settings.document
    );

    let state = StateData::new(
        Engine::new(&settings.serial, schema),
        PathBuf::from(settings.document),
        settings.reference.map(PathBuf::from),
        settings.interval,
    );

    rocket::build()
        .manage(state)
        .mount("/", routes![endpoints_route, metrics_route, diff_route])
}
