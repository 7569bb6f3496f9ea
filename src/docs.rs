use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::{health, navigation, session};

#[derive(OpenApi)]
#[openapi(
	paths(
		health::health,
		navigation::navigate,
		navigation::menu,
		navigation::routes,
		session::current,
		session::login,
		session::register,
		session::refresh,
		session::logout,
		session::authorize
	),
	components(
		schemas(
			health::HealthResponse,
			navigation::RouteSummary,
			session::PrincipalResponse,
			session::SignInResponse,
			session::MessageResponse,
			session::LoginBody,
			session::RegisterBody,
			session::AuthorizeBody,
			session::AuthorizeResponse
		)
	),
	tags(
		(name = "Health", description = "Liveness and session status"),
		(name = "Navigation", description = "Route guard decisions and menus"),
		(name = "Session", description = "Sign-in, refresh and logout")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	ensure_openapi_version(&mut doc);
	add_parameter_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).try_it_out_enabled(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_openapi_version(doc: &mut Value) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("openapi").or_insert_with(|| Value::String("3.1.0".to_string()));
	}
}

// Try-it-out needs a usable value for the navigate `path` query.
fn add_parameter_examples(doc: &mut Value) {
	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else {
		return;
	};

	for item in paths.values_mut() {
		let Some(operations) = item.as_object_mut() else {
			continue;
		};
		for operation in operations.values_mut() {
			let Some(params) = operation.get_mut("parameters").and_then(Value::as_array_mut) else {
				continue;
			};
			for param in params.iter_mut() {
				let example = match param.get("name").and_then(Value::as_str) {
					Some("path") => json!("/dashboard/courses"),
					Some("resolve") => json!(true),
					_ => continue,
				};
				if let Some(obj) = param.as_object_mut() {
					obj.entry("example").or_insert(example);
				}
			}
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
