use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{catalog, membership, recipes, shopping_list, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(catalog::router())
                .merge(recipes::router())
                .merge(membership::router())
                .merge(shopping_list::router())
                .merge(users::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{claims::TokenKind, jwt::sign_for_tests};
    use crate::testing::Fixture;

    struct Client {
        app: Router,
        fx: Fixture,
    }

    impl Client {
        async fn new() -> Self {
            let fx = Fixture::new().await;
            Self {
                app: build_app(fx.state.clone()),
                fx,
            }
        }

        fn token(&self, user: Uuid) -> String {
            sign_for_tests(&self.fx.state, user, TokenKind::Access, 300)
        }

        async fn send(&self, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Response {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
            }
            let req = match body {
                Some(v) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(v.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();
            self.app.clone().oneshot(req).await.unwrap()
        }

        fn recipe_body(&self, name: &str) -> Value {
            json!({
                "name": name,
                "text": "mix and bake",
                "cooking_time": 30,
                "tags": [self.fx.breakfast.id],
                "ingredients": [
                    {"id": self.fx.flour.id, "amount": 200},
                    {"name": "butter", "measurement_unit": "g", "amount": 50}
                ]
            })
        }
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let c = Client::new().await;
        let res = c.send(Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let c = Client::new().await;
        let res = c
            .send(Method::POST, "/api/v1/recipes", None, Some(c.recipe_body("tart")))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let refresh = sign_for_tests(&c.fx.state, c.fx.author, TokenKind::Refresh, 300);
        let req = Request::builder()
            .uri("/api/v1/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
            .body(Body::empty())
            .unwrap();
        let res = c.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn recipe_lifecycle_over_http() {
        let c = Client::new().await;
        let res = c
            .send(Method::POST, "/api/v1/recipes", Some(c.fx.author), Some(c.recipe_body("tart")))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = json_body(res).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["ingredients"][1]["name"], "butter");

        let res = c
            .send(Method::POST, "/api/v1/recipes", Some(c.fx.author), Some(c.recipe_body("tart")))
            .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let uri = format!("/api/v1/recipes/{id}");
        let res = c
            .send(Method::PATCH, &uri, Some(c.fx.reader), Some(json!({"cooking_time": 5})))
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = c
            .send(
                Method::PATCH,
                &uri,
                Some(c.fx.author),
                Some(json!({"ingredients": [{"id": c.fx.egg.id, "amount": 0}]})),
            )
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["field"], "amount");

        let res = c.send(Method::GET, "/api/v1/recipes", None, None).await;
        assert_eq!(json_body(res).await["count"], 1);

        let res = c.send(Method::DELETE, &uri, Some(c.fx.author), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let res = c.send(Method::GET, &uri, None, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cart_download_is_a_text_attachment() {
        let c = Client::new().await;
        let created = json_body(
            c.send(Method::POST, "/api/v1/recipes", Some(c.fx.author), Some(c.recipe_body("scones")))
                .await,
        )
        .await;
        let cart = format!("/api/v1/recipes/{}/shopping_cart", created["id"].as_str().unwrap());

        let res = c.send(Method::POST, &cart, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let res = c.send(Method::POST, &cart, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = c
            .send(Method::GET, "/api/v1/recipes/download_shopping_cart", Some(c.fx.reader), None)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shopping_list.txt\""
        );
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"flour - 200 g\nbutter - 50 g\n");

        let res = c.send(Method::DELETE, &cart, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let res = c.send(Method::DELETE, &cart, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subscribe_over_http() {
        let c = Client::new().await;
        let uri = format!("/api/v1/users/{}/subscribe", c.fx.author);
        let res = c.send(Method::POST, &uri, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(json_body(res).await["is_subscribed"], true);

        let own = format!("/api/v1/users/{}/subscribe", c.fx.reader);
        let res = c.send(Method::POST, &own, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = c
            .send(Method::GET, "/api/v1/users/subscriptions", Some(c.fx.reader), None)
            .await;
        assert_eq!(json_body(res).await["count"], 1);
    }

    #[tokio::test]
    async fn tag_filter_accepts_repeated_and_comma_separated_slugs() {
        let c = Client::new().await;
        let mut stew = c.recipe_body("stew");
        stew["tags"] = json!([c.fx.dinner.id]);
        for body in [c.recipe_body("muffins"), stew] {
            let res = c
                .send(Method::POST, "/api/v1/recipes", Some(c.fx.author), Some(body))
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        for uri in [
            "/api/v1/recipes?tags=breakfast&tags=dinner",
            "/api/v1/recipes?tags=breakfast,dinner",
        ] {
            let res = c.send(Method::GET, uri, None, None).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
            assert_eq!(json_body(res).await["count"], 2, "{uri}");
        }

        let res = c.send(Method::GET, "/api/v1/recipes?tags=dinner", None, None).await;
        assert_eq!(json_body(res).await["count"], 1);
    }

    #[tokio::test]
    async fn user_profiles_are_public_and_viewer_aware() {
        let c = Client::new().await;
        let res = c.send(Method::GET, "/api/v1/users?limit=5", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["count"], 2);

        let uri = format!("/api/v1/users/{}/subscribe", c.fx.author);
        c.send(Method::POST, &uri, Some(c.fx.reader), None).await;

        let profile = format!("/api/v1/users/{}", c.fx.author);
        let res = c.send(Method::GET, &profile, Some(c.fx.reader), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["is_subscribed"], true);

        let res = c.send(Method::GET, "/api/v1/users/me", Some(c.fx.reader), None).await;
        assert_eq!(json_body(res).await["username"], "reader");

        let missing = format!("/api/v1/users/{}", Uuid::new_v4());
        let res = c.send(Method::GET, &missing, None, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalog_reads_are_public() {
        let c = Client::new().await;
        let res = c.send(Method::GET, "/api/v1/ingredients?name=FL", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 2);

        let res = c.send(Method::GET, "/api/v1/tags", None, None).await;
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 2);
    }
}
