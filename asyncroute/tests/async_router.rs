use asyncroute::prelude::*;
use asyncroute::testing::TestClient;
use regex::Regex;

async fn render(err: Error, _req: Request, res: Response, _next: Next) -> Result<()> {
    res.status(StatusCode::INTERNAL_SERVER_ERROR).send(err.message);
    Ok(())
}

async fn oops(_req: Request, _res: Response, _next: Next) -> Result<()> {
    Err(Error::internal("Oops!"))
}

async fn pass(_req: Request, _res: Response, next: Next) -> Result<()> {
    next.proceed();
    Ok(())
}

/// An app with `router` mounted and a plain error stage after it.
fn app_with(router: AsyncRouter<Router>) -> App {
    let app = App::new();
    app.mount(route_args![router]).unwrap();
    app.mount(route_args![handler(render)]).unwrap();
    app
}

async fn assert_oops(app: App) {
    let client = TestClient::new(app).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Oops!");
}

#[tokio::test]
async fn test_route_builder_is_wrapped() {
    let router = async_router();
    router.route("/test").get(route_args![handler(oops)]).unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_verb_registration_is_wrapped() {
    let router = async_router();
    router.get(route_args!["/test", handler(oops)]).unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_returned_value_becomes_response() {
    let router = async_router();
    router
        .get(route_args![
            "/test",
            handler(Handler::sync(|req: Request, _res: Response, next: Next| {
                req.insert("Boo!");
                next.proceed();
                Ok::<_, Error>(())
            })),
            handler(|req: Request| async move {
                let result = async { "Oops!" }.await;
                let context = req.get::<&'static str>().map(|s| *s);
                Ok::<_, Error>(Json(serde_json::json!({
                    "result": result,
                    "context": context,
                })))
            }),
        ])
        .unwrap();

    let client = TestClient::new(app_with(router)).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "Oops!");
    assert_eq!(body["context"], "Boo!");
}

#[tokio::test]
async fn test_handler_sending_after_await() {
    let router = async_router();
    router
        .get(route_args![
            "/test",
            handler(|_req: Request, res: Response| async move {
                let result = async { "Oops!" }.await;
                res.json(&serde_json::json!({ "result": result }));
                Ok::<_, Error>(())
            })
        ])
        .unwrap();

    let client = TestClient::new(app_with(router)).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>()["result"], "Oops!");
}

#[tokio::test]
async fn test_sequence_of_handlers() {
    let router = async_router();
    router
        .get(route_args!["/test", vec![handler(pass), handler(oops)]])
        .unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_many_handlers() {
    let router = async_router();
    router
        .get(route_args!["/test", handler(pass), handler(oops)])
        .unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_sequence_of_mixed_handlers() {
    let router = async_router();
    let sync_pass = Handler::sync(|_req: Request, _res: Response, next: Next| {
        next.proceed();
        Ok::<_, Error>(())
    });
    router
        .get(route_args![
            "/test",
            vec![handler(sync_pass), handler(pass), handler(oops)]
        ])
        .unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_handler_calling_next_with_error() {
    let router = async_router();
    let sync_fail = Handler::sync(|_req: Request, _res: Response, next: Next| {
        next.fail(Error::internal("Oops!"));
        Ok::<_, Error>(())
    });
    router
        .get(route_args!["/test", vec![handler(pass), handler(sync_fail)]])
        .unwrap();

    assert_oops(app_with(router)).await;
}

#[tokio::test]
async fn test_arguments_after_a_sequence_are_kept() {
    let router = async_router();
    router
        .get(route_args![
            "/test",
            vec![handler(pass)],
            handler(|_req: Request| async move { Ok::<_, Error>("after the sequence") })
        ])
        .unwrap();

    let client = TestClient::new(app_with(router)).await;
    let response = client.get("/test").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "after the sequence");
}

#[tokio::test]
async fn test_post_put_and_patch() {
    let router = async_router();
    router
        .post(route_args![
            "/test",
            handler(|_req: Request| async { Ok::<_, Error>("POST request handled") })
        ])
        .unwrap()
        .put(route_args![
            "/test",
            handler(|_req: Request| async { Ok::<_, Error>("PUT request handled") })
        ])
        .unwrap()
        .patch(route_args![
            "/test",
            handler(|_req: Request| async {
                Ok::<_, Error>((StatusCode::ACCEPTED, "PATCH request handled"))
            })
        ])
        .unwrap();

    let client = TestClient::new(app_with(router)).await;

    let response = client.post("/test").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "POST request handled");

    let response = client.put("/test").send().await;
    assert_eq!(response.text(), "PUT request handled");

    let response = client.patch("/test").send().await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.text(), "PATCH request handled");
}

#[tokio::test]
async fn test_not_found_stage() {
    let app = App::new();
    app.mount(route_args![async_router()]).unwrap();
    app.mount(route_args![handler(|_req: Request, res: Response| async move {
        res.status(StatusCode::NOT_FOUND).send("Not Found");
        Ok::<_, Error>(())
    })])
    .unwrap();

    let client = TestClient::new(app).await;
    let response = client.get("/non-existing-route").send().await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Not Found");
}

#[tokio::test]
async fn test_compiled_pattern_route() {
    let router = async_router();
    router
        .get(route_args![
            Regex::new(r"^/files/(?P<name>[a-z]+)\.txt$").unwrap(),
            handler(|req: Request| async move {
                Ok::<_, Error>(format!("file {}", req.param("name").unwrap_or_default()))
            })
        ])
        .unwrap();

    let client = TestClient::new(app_with(router)).await;
    let response = client.get("/files/notes.txt").send().await;

    assert_eq!(response.text(), "file notes");
}

#[tokio::test]
async fn test_wrapping_an_app_directly() {
    let app = App::new();
    let router = AsyncRouter::wrap(app.clone());
    router.get(route_args!["/test", handler(oops)]).unwrap();
    app.mount(route_args![handler(render)]).unwrap();

    assert_oops(app).await;
}

#[test]
fn test_unsupported_argument_fails_registration() {
    let router = async_router();

    let err = router
        .get(route_args!["/test", handler(pass), "/stray"])
        .unwrap_err();
    assert!(matches!(err, UsageError::MisplacedPattern { position: 3, .. }));
    assert_eq!(
        err.to_string(),
        "get() expects a handler at argument 3 but got a path pattern"
    );

    assert!(matches!(
        router.param("", pass),
        Err(UsageError::EmptyParamName)
    ));
}
