//! Browser surface: session cookie, redirects, AJAX JSON.

mod common;

use axum::http::{header, StatusCode};
use axum_extra::extract::cookie::{Cookie, SameSite};
use common::{json_body, location, orders, text_body, Harness};

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login_with_next() {
    let h = Harness::new().await;
    let response = h.form("GET", "/trasa/edit/5/", None, false, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/?next=%2Ftrasa%2Fedit%2F5%2F");

    let response = h.form("GET", "/moje-trasy", Some("stale-session"), false, None).await;
    assert_eq!(location(&response), "/login/?next=%2Fmoje-trasy");

    let response = h.form("GET", "/trasa/5/punkty/?a=1&b=2", None, false, None).await;
    assert_eq!(location(&response), "/login/?next=%2Ftrasa%2F5%2Fpunkty%2F%3Fa%3D1%26b%3D2");
}

#[tokio::test]
async fn login_sets_session_and_follows_next() {
    let h = Harness::new().await;
    h.actor("alice").await;

    let response = h
        .form(
            "POST",
            "/login/",
            None,
            false,
            Some("username=alice&password=sekret123&next=%2Ftla%2F"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/tla/");
    let cookie = Cookie::parse(response.headers()[header::SET_COOKIE].to_str().unwrap().to_string()).unwrap();
    assert_eq!(cookie.name(), "sessionid");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    let key = cookie.value().to_string();

    let page = h.form("GET", "/tla/", Some(&key), false, None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(text_body(page).await.contains("Mapa"));

    let response = h.form("GET", "/logout/", Some(&key), false, None).await;
    assert_eq!(location(&response), "/");
    let removal = Cookie::parse(response.headers()[header::SET_COOKIE].to_str().unwrap().to_string()).unwrap();
    assert_eq!(removal.name(), "sessionid");
    assert_eq!(removal.value(), "");
    assert_eq!(removal.max_age().map(|age| age.whole_seconds()), Some(0));
    let response = h.form("GET", "/tla/", Some(&key), false, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn wrong_password_re_renders_login() {
    let h = Harness::new().await;
    h.actor("alice").await;
    let response = h
        .form("POST", "/login/", None, false, Some("username=alice&password=nope"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(text_body(response).await.contains("correct username and password"));
}

#[tokio::test]
async fn registration_creates_an_account() {
    let h = Harness::new().await;
    let response = h
        .form(
            "POST",
            "/register/",
            None,
            false,
            Some("username=nowy&email=nowy%40example.com&password1=dlugiehaslo&password2=dlugiehaslo"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/");

    let response = h
        .form(
            "POST",
            "/register/",
            None,
            false,
            Some("username=nowy&email=x%40example.com&password1=dlugiehaslo&password2=dlugiehaslo"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .form("POST", "/login/", None, false, Some("username=nowy&password=dlugiehaslo"))
        .await;
    assert_eq!(location(&response), "/moje-trasy/");
}

#[tokio::test]
async fn route_creation_form_redirects_to_editor() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let uri = format!("/trasa/create/{}/", h.background);

    let response = h.form("POST", &uri, Some(&alice.session), false, Some("nazwa=&opis=")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .form("POST", &uri, Some(&alice.session), false, Some("nazwa=Rowerem&opis=szybko"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let editor = location(&response).to_string();
    assert!(editor.starts_with("/trasa/edit/"));

    let page = h.form("GET", &editor, Some(&alice.session), false, None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(text_body(page).await.contains("Rowerem"));

    let mine = h.form("GET", "/moje-trasy/", Some(&alice.session), false, None).await;
    assert!(text_body(mine).await.contains("Rowerem"));
}

#[tokio::test]
async fn edit_post_appends_and_redirects() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let route = h.route_with_points(&alice, &[]).await;
    let uri = format!("/trasa/edit/{}/", route);

    let response = h.form("POST", &uri, Some(&alice.session), false, Some("x=10&y=10")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), uri);

    let response = h.form("POST", &uri, Some(&alice.session), true, Some("x=5&y=5")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(orders(&body), vec![1, 2]);
    assert_eq!(body["punkty"][1]["x"], 5);
}

#[tokio::test]
async fn invalid_edit_post_reports_the_field() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let route = h.route_with_points(&alice, &[]).await;
    let uri = format!("/trasa/edit/{}/", route);

    let response = h.form("POST", &uri, Some(&alice.session), false, Some("x=abc&y=1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(text_body(response).await.contains("A valid integer is required."));

    let response = h.form("POST", &uri, Some(&alice.session), true, Some("x=1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]["details"]["y"].is_array());
    assert!(h.points(route).await.is_empty());
}

#[tokio::test]
async fn add_point_click_is_ajax_only() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let route = h.route_with_points(&alice, &[(1, 1)]).await;
    let uri = format!("/trasa/{}/add-point-click/", route);

    let response = h.form("POST", &uri, Some(&alice.session), false, Some("x=3&y=4")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, serde_json::json!({"success": false}));
    assert_eq!(h.points(route).await.len(), 1);

    let response = h.form("POST", &uri, Some(&alice.session), true, Some("x=3&y=4")).await;
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let points = h.points(route).await;
    assert_eq!(body["punkt_id"], points[1].0);
    assert_eq!(points[1].3, 2);
}

#[tokio::test]
async fn delete_and_move_return_the_points_to_ajax_callers() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let route = h.route_with_points(&alice, &[(1, 1), (2, 2), (3, 3)]).await;
    let ids: Vec<i64> = h.points(route).await.iter().map(|p| p.0).collect();

    let response = h
        .form("GET", &format!("/punkt/delete/{}/", ids[1]), Some(&alice.session), true, None)
        .await;
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(orders(&body), vec![1, 2]);
    assert_eq!(body["punkty"][1]["id"], ids[2]);

    let response = h
        .form("GET", &format!("/punkt/move/{}/up", ids[2]), Some(&alice.session), false, None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/trasa/edit/{}/", route));
    let listed = h
        .form("GET", &format!("/trasa/{}/punkty/", route), Some(&alice.session), false, None)
        .await;
    let body = json_body(listed).await;
    assert_eq!(body["punkty"][0]["id"], ids[2]);
    assert_eq!(orders(&body), vec![1, 2]);
}

#[tokio::test]
async fn foreign_routes_and_points_are_not_found() {
    let h = Harness::new().await;
    let alice = h.actor("alice").await;
    let bob = h.actor("bob").await;
    let route = h.route_with_points(&alice, &[(1, 1), (2, 2)]).await;
    let point = h.points(route).await[0].0;
    let before = h.points(route).await;

    for (method, uri, form) in [
        ("GET", format!("/trasa/edit/{}/", route), None),
        ("POST", format!("/trasa/edit/{}/", route), Some("x=1&y=1")),
        ("POST", format!("/trasa/{}/add-point-click/", route), Some("x=1&y=1")),
        ("POST", format!("/trasa/{}/add-point-click/", route), Some("x=abc&y=1")),
        ("GET", format!("/trasa/{}/punkty/", route), None),
        ("GET", format!("/punkt/delete/{}/", point), None),
        ("GET", format!("/punkt/move/{}/down/", point), None),
        ("GET", format!("/punkt/move/{}/sideways/", point), None),
        ("GET", "/punkt/delete/999999/".to_string(), None),
    ] {
        let response = h.form(method, &uri, Some(&bob.session), true, form).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
    }
    assert_eq!(h.points(route).await, before);
}
