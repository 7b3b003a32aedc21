use asyncroute::config::{ServerConfig, load_dotenv};
use asyncroute::observability::TracingConfig;
use asyncroute::prelude::*;

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct User {
    user_id: u64,
    name: String,
}

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

async fn load_user(req: Request, _res: Response, next: Next, user_id: String) -> Result<()> {
    let user_id: u64 = user_id
        .parse()
        .map_err(|_| Error::bad_request(format!("'{}' is not a user id", user_id)))?;
    if user_id == 0 {
        return Err(Error::not_found(format!("user {} not found", user_id)));
    }

    req.insert(User {
        user_id,
        name: "John".to_string(),
    });
    next.proceed();
    Ok(())
}

async fn show_user(req: Request) -> Result<Option<Json<User>>> {
    Ok(req.get::<User>().map(|user| Json((*user).clone())))
}

async fn create_user(req: Request) -> Result<(StatusCode, Json<User>)> {
    let input: CreateUser = serde_json::from_slice(req.body())
        .map_err(|err| Error::validation(err.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(User {
            user_id: 1,
            name: input.name,
        }),
    ))
}

async fn list_users(_req: Request) -> Result<Json<Vec<User>>> {
    Ok(Json(vec![
        User {
            user_id: 1,
            name: "Alice".to_string(),
        },
        User {
            user_id: 2,
            name: "Bob".to_string(),
        },
    ]))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    load_dotenv();
    TracingConfig::from_env()
        .unwrap_or_default()
        .init();

    let users = async_router();
    users.param("userId", load_user).unwrap();
    users
        .route("/users")
        .get(route_args![handler(list_users)])
        .unwrap()
        .post(route_args![handler(create_user)])
        .unwrap();
    users
        .get(route_args!["/users/:userId", handler(show_user)])
        .unwrap();

    let app = App::new();
    app.mount(route_args![users]).unwrap();

    let config = ServerConfig::from_env().unwrap_or_default();
    app.listen(&config.addr()).await
}
