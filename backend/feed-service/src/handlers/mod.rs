pub mod auth;
pub mod feed;
pub mod posts;
pub mod trending;

use actix_web::web;

pub use auth::{logout, AuthHandlerState};
pub use feed::{get_feed, FeedHandlerState, FeedQueryParams};
pub use posts::{
    add_comment, create_post, delete_comment, delete_post, get_post, get_user_posts,
    like_post, list_comments, unlike_post, update_post, PostHandlerState,
};
pub use trending::{get_trending, TrendingHandlerState};

/// Register every `/api/v1` route. State and middleware are attached by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_feed)
        .service(get_user_posts)
        .service(create_post)
        .service(get_post)
        .service(update_post)
        .service(delete_post)
        .service(like_post)
        .service(unlike_post)
        .service(add_comment)
        .service(list_comments)
        .service(delete_comment)
        .service(get_trending)
        .service(logout);
}
