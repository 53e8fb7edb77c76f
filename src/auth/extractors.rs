use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::jwt::Claims;
use crate::error::AppError;

/// Extracteur d'authentification pour les routes protégées.
/// Valide `Authorization: Bearer <JWT>`, vérifie le token via `JwtManager`,
/// et expose les claims utiles (notamment `sub`).
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub sub: Uuid,
    pub email: String,
    pub jti: Uuid,
}

impl From<Claims> for AuthClaims {
    fn from(c: Claims) -> Self {
        Self {
            sub: c.sub,
            email: c.email,
            jti: c.jti,
        }
    }
}

impl FromRequestParts<AppState> for AuthClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        const BEARER: &str = "Bearer ";

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AppError::InvalidToken)?
            .strip_prefix(BEARER)
            .ok_or(AppError::InvalidToken)?;

        let claims = state
            .auth
            .jwt_manager()
            .verify_token(token.trim(), state.auth.now())?;

        let claims = AuthClaims::from(claims);
        tracing::debug!(account_id = %claims.sub, token_id = %claims.jti, "Bearer token accepted");
        Ok(claims)
    }
}

/// Adresse du client, toujours une `IpAddr` valide ou `"unknown"`.
///
/// Sans proxy de confiance (`trusted_proxies == 0`) c'est l'adresse de la
/// socket et `X-Forwarded-For` est ignoré. Derrière `n` proxies, chacun ajoute
/// à droite l'adresse qu'il a vue: le client est le n-ième saut en partant de
/// la droite. Tout ce qui est à gauche vient du client et n'est pas lu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_parts(parts: &Parts, trusted_proxies: usize) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let ip = if trusted_proxies == 0 {
            peer
        } else {
            forwarded_hop(parts, trusted_proxies).or(peer)
        };

        ClientIp(ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string()))
    }
}

fn forwarded_hop(parts: &Parts, trusted_proxies: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = parts
        .headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect();

    let index = hops.len().checked_sub(trusted_proxies)?;
    hops.get(index)?.parse().ok()
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, state.trusted_proxies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    fn from_peer(builder: axum::http::request::Builder) -> Parts {
        let mut p = parts(builder);
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        p
    }

    #[test]
    fn forwarded_headers_are_ignored_without_trusted_proxy() {
        let p = from_peer(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.7")
                .header("x-real-ip", "198.51.100.2"),
        );
        assert_eq!(ClientIp::from_parts(&p, 0).0, "192.0.2.1");
    }

    #[test]
    fn behind_one_proxy_the_rightmost_hop_is_the_client() {
        // the left entry was written by the client itself
        let p = from_peer(Request::builder().header("x-forwarded-for", "10.9.9.9, 203.0.113.7"));
        assert_eq!(ClientIp::from_parts(&p, 1).0, "203.0.113.7");
    }

    #[test]
    fn behind_two_proxies_the_second_hop_from_the_right_is_the_client() {
        let p = from_peer(
            Request::builder()
                .header("x-forwarded-for", "10.9.9.9, 203.0.113.7")
                .header("x-forwarded-for", "10.0.0.2"),
        );
        assert_eq!(ClientIp::from_parts(&p, 2).0, "203.0.113.7");
    }

    #[test]
    fn garbage_or_short_forwarded_chain_falls_back_to_peer() {
        let long = "a".repeat(200);
        let p = from_peer(Request::builder().header("x-forwarded-for", long.as_str()));
        assert_eq!(ClientIp::from_parts(&p, 1).0, "192.0.2.1");

        let p = from_peer(Request::builder().header("x-forwarded-for", "203.0.113.7"));
        assert_eq!(ClientIp::from_parts(&p, 2).0, "192.0.2.1");
    }

    #[test]
    fn no_peer_and_no_usable_hop_is_unknown() {
        let p = parts(Request::builder().header("x-forwarded-for", "203.0.113.7"));
        assert_eq!(ClientIp::from_parts(&p, 0).0, "unknown");

        let p = parts(Request::builder().header("x-forwarded-for", "::1"));
        assert_eq!(ClientIp::from_parts(&p, 1).0, "::1");
    }
}
