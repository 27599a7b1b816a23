use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::ApiError;
use crate::models::*;
use crate::service::{NexioService, UserQuery};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/nexios")
                    .route(web::get().to(list_feed))
                    .route(web::post().to(create_nexio)),
            )
            .service(
                web::resource("/nexios/{id}")
                    .route(web::get().to(get_nexio))
                    .route(web::delete().to(delete_nexio)),
            )
            .service(web::resource("/nexios/{id}/comments").route(web::post().to(add_comment)))
            .service(web::resource("/users").route(web::get().to(list_users)))
            .service(
                web::resource("/users/{external_id}")
                    .route(web::get().to(get_user))
                    .route(web::put().to(upsert_user)),
            )
            .service(web::resource("/users/{external_id}/nexios").route(web::get().to(list_user_nexios)))
            .service(web::resource("/users/{external_id}/activity").route(web::get().to(get_activity)))
            .service(web::resource("/communities").route(web::post().to(create_community))),
    );
}

#[derive(Clone)]
pub struct AppState { pub service: NexioService }

fn default_path() -> String { "/".into() }

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNexioRequest {
    #[validate(length(min = 3, message = "Minimum 3 characters"))]
    pub text: String,
    pub author_id: Id,
    /// External id of the community to post in; personal post when absent.
    pub community_id: Option<String>,
    #[serde(default = "default_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CommentRequest {
    #[validate(length(min = 3, message = "Minimum 3 characters"))]
    pub text: String,
    pub author_id: Id,
    #[serde(default = "default_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertUserRequest {
    #[validate(length(min = 1, max = 30))]
    pub username: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommunityRequest {
    #[validate(length(min = 1))]
    pub external_id: String,
    #[validate(length(min = 1, max = 30))]
    pub username: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub exclude: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<SortOrder>,
}

fn page_request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
}

#[utoipa::path(
    get,
    path = "/api/v1/nexios",
    params(
        ("page" = Option<u32>, Query, description = "1-indexed page number"),
        ("page_size" = Option<u32>, Query, description = "Posts per page (default 20)")
    ),
    responses(
        (status = 200, description = "Top-level posts, newest first", body = NexioCardPage)
    )
)]
pub async fn list_feed(data: web::Data<AppState>, query: web::Query<FeedQuery>) -> Result<HttpResponse, ApiError> {
    let page = page_request(query.page, query.page_size);
    let feed = data.service.list_feed(page).await?;
    Ok(HttpResponse::Ok().json(feed))
}

#[utoipa::path(
    post,
    path = "/api/v1/nexios",
    request_body = CreateNexioRequest,
    responses(
        (status = 201, description = "Nexio created", body = Nexio),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn create_nexio(data: web::Data<AppState>, payload: web::Json<CreateNexioRequest>) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();
    let nexio = data
        .service
        .create_nexio(&req.text, req.author_id, req.community_id.as_deref(), &req.path)
        .await?;
    Ok(HttpResponse::Created().json(nexio))
}

#[utoipa::path(
    get,
    path = "/api/v1/nexios/{id}",
    params(("id" = Id, Path, description = "Nexio id")),
    responses(
        (status = 200, description = "Nexio with two levels of replies", body = NexioThread),
        (status = 404, description = "Nexio not found")
    )
)]
pub async fn get_nexio(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let thread = data.service.fetch_nexio(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    delete,
    path = "/api/v1/nexios/{id}",
    params(
        ("id" = Id, Path, description = "Nexio id"),
        ("path" = Option<String>, Query, description = "Page path to revalidate")
    ),
    responses(
        (status = 204, description = "Nexio and all replies deleted"),
        (status = 404, description = "Nexio not found"),
        (status = 409, description = "Replies were added during the delete; nothing removed")
    )
)]
pub async fn delete_nexio(data: web::Data<AppState>, path: web::Path<Id>, query: web::Query<DeleteQuery>) -> Result<HttpResponse, ApiError> {
    let page_path = query.into_inner().path.unwrap_or_else(default_path);
    data.service.delete_nexio(path.into_inner(), &page_path).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/nexios/{id}/comments",
    params(("id" = Id, Path, description = "Nexio being replied to")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Nexio),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Nexio not found")
    )
)]
pub async fn add_comment(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<CommentRequest>) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();
    let comment = data
        .service
        .add_comment(path.into_inner(), &req.text, req.author_id, &req.path)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("exclude" = Option<String>, Query, description = "External id left out of the results"),
        ("search" = Option<String>, Query, description = "Matches username or name, case-insensitive"),
        ("page" = Option<u32>, Query, description = "1-indexed page number"),
        ("page_size" = Option<u32>, Query, description = "Users per page (default 20)"),
        ("sort" = Option<SortOrder>, Query, description = "Creation time order")
    ),
    responses(
        (status = 200, description = "Users", body = UserPage)
    )
)]
pub async fn list_users(data: web::Data<AppState>, query: web::Query<UsersQuery>) -> Result<HttpResponse, ApiError> {
    let q = query.into_inner();
    let mut user_query = UserQuery::new(q.exclude.unwrap_or_default())
        .page(page_request(q.page, q.page_size))
        .sort(q.sort.unwrap_or_default());
    if let Some(search) = q.search {
        user_query = user_query.search(search);
    }
    let users = data.service.list_users(user_query).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{external_id}",
    params(("external_id" = String, Path, description = "Auth provider user id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = data.service.fetch_user(&path.into_inner()).await?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{external_id}",
    params(("external_id" = String, Path, description = "Auth provider user id")),
    request_body = UpsertUserRequest,
    responses(
        (status = 200, description = "User created or updated", body = User),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn upsert_user(data: web::Data<AppState>, path: web::Path<String>, payload: web::Json<UpsertUserRequest>) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();
    let profile = UserProfile {
        external_id: path.into_inner(),
        username: req.username,
        name: req.name,
        bio: req.bio,
        image: req.image,
    };
    let user = data.service.upsert_user(profile, &req.path).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{external_id}/nexios",
    params(("external_id" = String, Path, description = "Auth provider user id")),
    responses(
        (status = 200, description = "User with authored posts", body = UserNexios),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_nexios(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let posts = data.service.fetch_user_nexios(&path.into_inner()).await?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{external_id}/activity",
    params(("external_id" = String, Path, description = "Auth provider user id")),
    responses(
        (status = 200, description = "Replies from other users", body = [NexioSummary])
    )
)]
pub async fn get_activity(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let replies = data.service.get_activity(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(replies))
}

#[utoipa::path(
    post,
    path = "/api/v1/communities",
    request_body = CreateCommunityRequest,
    responses(
        (status = 201, description = "Community created", body = Community),
        (status = 409, description = "Conflict")
    )
)]
pub async fn create_community(data: web::Data<AppState>, payload: web::Json<CreateCommunityRequest>) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();
    let community = data
        .service
        .create_community(NewCommunity {
            external_id: req.external_id,
            username: req.username,
            name: req.name,
            image: req.image,
            bio: req.bio,
        })
        .await?;
    log::info!("community {} created", community.external_id);
    Ok(HttpResponse::Created().json(community))
}
