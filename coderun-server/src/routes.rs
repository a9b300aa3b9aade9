use crate::errors::{self, reject_anyhow, reject_error};
use crate::App;

use coderun_judger::{lang, RunnerStats};
use coderun_protocol::error::ErrorCode;
use coderun_protocol::lang::LanguageInfo;
use coderun_protocol::run::{RunCasesOutput, RunCasesRequest, RunCodeRequest};

use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::SemaphorePermit;
use validator::Validate;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

macro_rules! impl_filter{
    () => {
        impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static
    };
    ($($ty:ty,)+) => {
        impl Filter<Extract = ($($ty,)+), Error = Infallible> + Clone + Send + Sync + 'static
    };
}

const MAX_BODY_SIZE: u64 = 1024 * 1024;

pub fn routes(app: Arc<App>) -> impl_filter!() {
    let prefix = warp::path("api");
    prefix.and(run_routes(app)).recover(errors::recover)
}

fn run_routes(app: Arc<App>) -> impl_filter!() {
    let run_code = warp::path("run-code")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(with_app(&app))
        .and(warp::body::json())
        .and_then(run_code);

    let run_cases = warp::path("run-cases")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(with_app(&app))
        .and(warp::body::json())
        .and_then(run_cases);

    let languages = warp::path("languages")
        .and(warp::path::end())
        .and(warp::get())
        .map(languages);

    let status = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_app(&app))
        .map(status);

    run_code.or(run_cases).or(languages).or(status)
}

fn with_app(app: &Arc<App>) -> impl_filter!(Arc<App>,) {
    let app = app.clone();
    warp::any().map(move || app.clone())
}

fn validate(body: &impl Validate) -> Result<(), Rejection> {
    body.validate()
        .map_err(|err| reject_error(ErrorCode::InvalidRequest, Some(err.to_string())))
}

/// Unknown languages are rejected without waiting for admission.
fn check_language(language_id: u32) -> Result<(), Rejection> {
    lang::resolve(language_id).map(drop).map_err(reject_anyhow)
}

async fn admit(app: &App) -> Result<SemaphorePermit<'_>, Rejection> {
    app.admission
        .acquire()
        .await
        .map_err(|err| reject_anyhow(err.into()))
}

/// POST /api/run-code
/// JSON: RunCodeRequest => Verdict
async fn run_code(app: Arc<App>, body: RunCodeRequest) -> Result<Response, Rejection> {
    validate(&body)?;
    check_language(body.language_id)?;
    let _permit = admit(&app).await?;
    let verdict = app.runner.execute(&body).await.map_err(reject_anyhow)?;
    Ok(reply::json(&verdict).into_response())
}

/// POST /api/run-cases
/// JSON: RunCasesRequest => RunCasesOutput
async fn run_cases(app: Arc<App>, body: RunCasesRequest) -> Result<Response, Rejection> {
    validate(&body)?;
    check_language(body.language_id)?;
    let _permit = admit(&app).await?;
    let verdicts = app.runner.judge(&body).await.map_err(reject_anyhow)?;
    let output = RunCasesOutput::new(verdicts, body.cases.len());
    Ok(reply::json(&output).into_response())
}

/// GET /api/languages
fn languages() -> Response {
    let list: Vec<LanguageInfo> = lang::languages().map(|l| l.info()).collect();
    reply::json(&list).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    #[serde(flatten)]
    stats: RunnerStats,
    max_concurrency: usize,
    available_permits: usize,
}

/// GET /api/status
fn status(app: Arc<App>) -> Response {
    let output = StatusOutput {
        stats: app.runner.stats(),
        max_concurrency: app.max_concurrency,
        available_permits: app.admission.available_permits(),
    };
    reply::json(&output).into_response()
}
