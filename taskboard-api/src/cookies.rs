/// Token cookies
///
/// Login and refresh set `accessToken` and `refreshToken` as HttpOnly cookies;
/// logout replaces both with removal cookies. In production the cookies are
/// `Secure; SameSite=None` so a frontend on another origin can send them;
/// otherwise `SameSite=Lax`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taskboard_shared::auth::{
    jwt::TokenPair,
    middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
};

use crate::config::Config;

/// Builds an HttpOnly cookie scoped to the whole API
pub fn build_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .max_age(max_age)
        .build()
}

/// Sets both token cookies, each living as long as its token
pub fn token_cookies(jar: CookieJar, tokens: &TokenPair, config: &Config) -> CookieJar {
    let secure = config.api.production;
    let settings = config.token_settings();

    jar.add(build_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        time::Duration::seconds(settings.access_ttl.num_seconds()),
        secure,
    ))
    .add(build_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        time::Duration::seconds(settings.refresh_ttl.num_seconds()),
        secure,
    ))
}

/// Expires both token cookies, whether or not the request carried them
pub fn cleared_token_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    let secure = config.api.production;

    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = build_cookie(name, String::new(), time::Duration::ZERO, secure);
            cookie.make_removal();
            jar.add(cookie)
        })
}
