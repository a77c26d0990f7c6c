use std::convert::Infallible;

use serde::Deserialize;
use serde_json::json;
use warp::{hyper::body::Bytes, http::StatusCode, Filter, Reply};

use crate::{
    directory::{self, CreateRequest, SearchQuery},
    session, Relay,
};

static INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <title>Room Relay</title>
    </head>
    <body>
        <h1>Room relay</h1>
        <div id="chat">
            <p><em>Pick a name to connect</em></p>
        </div>
        <input type="text" id="to" placeholder="user or room" />
        <select id="kind">
            <option value="direct">direct</option>
            <option value="room">room</option>
            <option value="join">join</option>
            <option value="leave">leave</option>
        </select>
        <input type="text" id="text" />
        <button type="button" id="send">Send</button>
        <script type="text/javascript">
        const chat = document.getElementById('chat');
        const username = prompt('Username') || 'guest';
        const uri = 'ws://' + location.host + '/ws?username=' + encodeURIComponent(username);
        const ws = new WebSocket(uri);
        function line(data) {
            const p = document.createElement('p');
            p.innerText = data;
            chat.appendChild(p);
        }
        ws.onopen = function() {
            chat.innerHTML = '<p><em>Connected as ' + username + '</em></p>';
        };
        ws.onmessage = function(msg) {
            const envelope = JSON.parse(msg.data);
            line('<' + envelope.from + '> [' + envelope.type + '] ' + (envelope.message || ''));
        };
        ws.onclose = function() {
            line('Disconnected!');
        };
        send.onclick = function() {
            const envelope = {
                type: document.getElementById('kind').value,
                to: document.getElementById('to').value,
                message: text.value,
            };
            ws.send(JSON.stringify(envelope));
            text.value = '';
        };
        </script>
    </body>
</html>
"#;

#[derive(Debug, Default, Deserialize)]
struct UpgradeQuery {
    #[serde(default)]
    username: String,
}

// GET / -> index html
fn index() -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML))
}

fn with_relay(relay: Relay) -> impl warp::Filter<Extract = (Relay,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

async fn upgrade_connection(
    ws: warp::ws::Ws,
    query: UpgradeQuery,
    relay: Relay,
) -> Result<warp::reply::Response, Infallible> {
    let username = query.username;
    if username.is_empty() {
        log::warn!("websocket upgrade rejected: username is required");
        return Ok(
            warp::reply::with_status("Username is required", StatusCode::BAD_REQUEST)
                .into_response(),
        );
    }

    // This will call our function if the handshake succeeds.
    Ok(ws
        .on_upgrade(move |socket| session::user_connected(socket, relay, username))
        .into_response())
}

// GET /ws?username={name} -> websocket upgrade
fn ws_upgrade(
    relay: Relay,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        // The `ws()` filter will prepare Websocket handshake...
        .and(warp::ws())
        .and(warp::query::<UpgradeQuery>())
        .and(with_relay(relay))
        .and_then(upgrade_connection)
}

async fn search_directory(query: SearchQuery, relay: Relay) -> Result<impl warp::Reply, Infallible> {
    let names = directory::search(&relay, &query).await;
    Ok(warp::reply::json(&names))
}

// GET /search?q={substring}&type=user|room -> json array of names
fn search(
    relay: Relay,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("search")
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(with_relay(relay))
        .and_then(search_directory)
}

async fn create_entry(body: Bytes, relay: Relay) -> Result<impl warp::Reply, Infallible> {
    // Any content type is accepted; a body that does not decode falls through
    // to the invalid-type error like an empty request.
    let request: CreateRequest = serde_json::from_slice(&body).unwrap_or_default();
    let reply = match directory::create(&relay, &request).await {
        Ok(()) => warp::reply::with_status(
            warp::reply::json(&json!({ "message": "Room created successfully" })),
            StatusCode::CREATED,
        ),
        Err(e) => warp::reply::with_status(
            warp::reply::json(&json!({ "error": e.to_string() })),
            e.status(),
        ),
    };
    Ok(reply)
}

// POST /create {type, name} -> 201 | 409 | 400
fn create(
    relay: Relay,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("create")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::bytes())
        .and(with_relay(relay))
        .and_then(create_entry)
}

pub fn build_filters(
    relay: Relay,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    index()
        .or(ws_upgrade(relay.clone()))
        .or(search(relay.clone()))
        .or(create(relay))
        .with(warp::log("room_relay"))
}
