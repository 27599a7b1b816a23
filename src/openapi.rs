use crate::models::{
    AuthorSummary, Community, CommunitySummary, NewCommunity, Nexio, NexioCard, NexioCardPage, NexioSummary,
    NexioThread, SortOrder, User, UserNexios, UserPage, UserProfile,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_feed,
        crate::routes::create_nexio,
        crate::routes::get_nexio,
        crate::routes::delete_nexio,
        crate::routes::add_comment,
        crate::routes::list_users,
        crate::routes::get_user,
        crate::routes::upsert_user,
        crate::routes::list_user_nexios,
        crate::routes::get_activity,
        crate::routes::create_community,
    ),
    components(schemas(
        Nexio, NexioSummary, NexioCard, NexioThread, NexioCardPage,
        User, UserProfile, UserNexios, UserPage, AuthorSummary,
        Community, CommunitySummary, NewCommunity, SortOrder,
        crate::routes::CreateNexioRequest, crate::routes::CommentRequest,
        crate::routes::UpsertUserRequest, crate::routes::CreateCommunityRequest
    )),
    tags(
        (name = "nexios", description = "Posts and comment trees"),
        (name = "users", description = "Profiles, listings and activity"),
    )
)]
pub struct ApiDoc;
