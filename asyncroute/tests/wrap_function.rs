use asyncroute::prelude::*;
use asyncroute::testing::TestClient;

async fn render(err: Error, _req: Request, res: Response, _next: Next) -> Result<()> {
    res.status(StatusCode::INTERNAL_SERVER_ERROR).send(err.message);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    user_id: String,
    name: String,
}

#[tokio::test]
async fn test_failure_reaches_error_handler() {
    let app = App::new();
    let router = Router::new();
    router
        .get(route_args![
            "/test",
            wrap(|_req: Request, _res: Response, _next: Next| async move {
                Err::<(), _>(Error::internal("Oops!"))
            })
        ])
        .unwrap();
    app.mount(route_args![router]).unwrap();
    app.mount(route_args![handler(render)]).unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Oops!");
}

#[tokio::test]
async fn test_handler_that_sends_itself() {
    let app = App::new();
    let router = Router::new();
    router
        .get(route_args![
            "/test",
            wrap(|_req: Request, res: Response, _next: Next| async move {
                res.send("Success!");
                Ok::<_, Error>(())
            })
        ])
        .unwrap();
    app.mount(route_args![router]).unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "Success!");
}

#[tokio::test]
async fn test_param_binding() {
    let app = App::new();
    let router = Router::new();
    router
        .param(
            "userId",
            wrap(
                |req: Request, _res: Response, next: Next, user_id: String| async move {
                    let user = User {
                        user_id,
                        name: "John".to_string(),
                    };
                    req.insert(user);
                    next.proceed();
                    Ok::<_, Error>(())
                },
            ),
        )
        .unwrap();
    router
        .get(route_args![
            "/user/:userId",
            handler(|req: Request, res: Response| async move {
                match req.get::<User>() {
                    Some(user) => res.json(&*user),
                    None => res.status(StatusCode::NOT_FOUND).end(),
                };
                Ok::<_, Error>(())
            })
        ])
        .unwrap();
    app.mount(route_args![router]).unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/user/10").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.json::<User>(),
        User {
            user_id: "10".to_string(),
            name: "John".to_string(),
        }
    );
}

#[tokio::test]
async fn test_param_binding_failure() {
    let app = App::new();
    let router = Router::new();
    router
        .param(
            "userId",
            wrap(
                |_req: Request, _res: Response, _next: Next, user_id: String| async move {
                    Err::<(), _>(Error::not_found(format!("User {} not found", user_id)))
                },
            ),
        )
        .unwrap();
    router
        .get(route_args![
            "/user/:userId",
            wrap(|_req: Request| async move { Ok::<_, Error>("unreachable") })
        ])
        .unwrap();
    app.mount(route_args![router]).unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/user/99").send().await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "User 99 not found");
}

#[tokio::test]
async fn test_unwrapped_failure_is_lost() {
    let app = App::new();
    app.get(route_args![
        "/test",
        handler(|_req: Request| async move { Err::<(), _>(Error::internal("Oops!")) })
    ])
    .unwrap();
    app.mount(route_args![handler(render)]).unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/test").send().await;

    // the error stage never runs; the chain stalls into an empty 500
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "");
}
