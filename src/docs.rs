use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::{ErrorResponse, FieldError};
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::google,
		routes::auth::google_callback,
		routes::users::list_users,
		routes::users::create_user,
		routes::users::get_user,
		routes::users::update_user,
		routes::users::update_role,
		routes::users::delete_user,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::tasks::get_task,
		routes::tasks::update_task,
		routes::tasks::delete_task,
		routes::notes::list_notes,
		routes::notes::add_note,
		routes::notes::edit_note,
		routes::notes::delete_note,
		routes::subtasks::list_subtasks,
		routes::subtasks::add_subtask,
		routes::subtasks::update_subtask,
		routes::subtasks::delete_subtask
	),
	components(
		schemas(
			ErrorResponse,
			FieldError,
			routes::health::HealthResponse,
			models::role::Role,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::CreateUserRequest,
			models::user::UserUpdateRequest,
			models::user::RoleUpdateRequest,
			models::task::Task,
			models::task::TaskStatus,
			models::task::TaskKind,
			models::task::Priority,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::note::Note,
			models::note::NoteKind,
			models::note::NoteCreateRequest,
			models::note::NoteUpdateRequest,
			models::subtask::Subtask,
			models::subtask::SubtaskCreateRequest,
			models::subtask::SubtaskUpdateRequest
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Password and federated sign-in"),
		(name = "Users", description = "Account and role management"),
		(name = "Tasks", description = "Task tracking"),
		(name = "Notes", description = "Troubleshooting notes on tasks"),
		(name = "Subtasks", description = "Checklist items on tasks")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_global_security(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc = Arc::new(doc);
	let json_route = get(move || {
		let doc = Arc::clone(&doc);
		async move { Json((*doc).clone()) }
	});

	Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else {
		return;
	};

	let components = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()));
	if let Some(components) = components.as_object_mut() {
		let schemes = components
			.entry("securitySchemes")
			.or_insert_with(|| Value::Object(Map::new()));
		if let Some(schemes) = schemes.as_object_mut() {
			schemes.insert(
				"bearerAuth".to_string(),
				json!({
					"type": "http",
					"scheme": "bearer",
					"bearerFormat": "JWT"
				}),
			);
		}
	}
}

// Operations that declare `security(())` keep their own empty requirement.
fn ensure_global_security(doc: &mut Value) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("security")
			.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{port}");

	match doc.get_mut("servers") {
		Some(Value::Array(servers)) => {
			let has = servers
				.iter()
				.any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				servers.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
