use crate::lookup::{Lookup, LookupError};
use crate::plate::PlateError;
use log::{error, info, warn};
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Debug)]
struct LookupRejection(LookupError);

impl warp::reject::Reject for LookupRejection {}

pub async fn run(addr: SocketAddr, lookup: Lookup) {
    info!("Listening on http://{}", addr);
    warp::serve(routes(lookup)).run(addr).await;
}

pub fn routes(
    lookup: Lookup,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::json(&"Bem vindo à API!"));
    let placa = warp::get()
        .and(warp::path!("placa" / String))
        .and(warp::any().map(move || lookup.clone()))
        .and_then(handle_lookup);
    let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);
    // Error replies carry the CORS headers too.
    index.or(placa).recover(handle_rejection).with(cors)
}

async fn handle_lookup(segment: String, lookup: Lookup) -> Result<impl Reply, Rejection> {
    let plate = match percent_decode_str(&segment).decode_utf8() {
        Ok(p) => p.into_owned(),
        Err(e) => {
            warn!("Rejecting plate segment {:?}: {}", segment, e);
            let e = LookupError::InvalidPlate(PlateError::Encoding);
            return Err(warp::reject::custom(LookupRejection(e)));
        }
    };
    match lookup.run(&plate).await {
        Ok(result) => Ok(warp::reply::json(&result)),
        Err(e) => {
            if let LookupError::Upstream(_) = e {
                error!("Error looking up plate {:?}: {}", plate, e);
            }
            Err(warp::reject::custom(LookupRejection(e)))
        }
    }
}

fn error_reply(status: StatusCode, message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(LookupRejection(e)) = err.find::<LookupRejection>() {
        return Ok(error_reply(e.status(), e.public_message()));
    }
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Rota não encontrada."));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "Método não permitido.",
        ));
    }
    error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Placa inválida ou não encontrada.",
    ))
}
