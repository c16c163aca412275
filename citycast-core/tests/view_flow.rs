//! End-to-end controller flows over the real OpenWeatherMap client and a
//! mock server.

use std::{sync::Arc, time::Duration};

use citycast_core::{
    ForecastDays, Phase, ViewSettings, WeatherController, WeatherSource,
    provider::openweather::OpenWeatherProvider,
    runtime_env::{API_KEY_VAR, MapEnv, RuntimeEnv},
};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> ViewSettings {
    ViewSettings {
        forecast_days: ForecastDays::Four,
        debounce: Duration::from_millis(30),
        ..ViewSettings::default()
    }
}

fn live_controller(server: &MockServer) -> WeatherController {
    let provider = OpenWeatherProvider::with_base_url("KEY".to_string(), server.uri());
    WeatherController::new(WeatherSource::Live(Arc::new(provider)), settings())
}

async fn mount_city(server: &MockServer, city: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": city,
            "sys": { "country": "GB" },
            "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
            "main": { "temp": temp, "feels_like": temp, "humidity": 50, "pressure": 1013 },
            "wind": { "speed": 1.5 }
        })))
        .mount(server)
        .await;

    let list: Vec<_> = (0..40)
        .map(|i| {
            serde_json::json!({
                "dt": 1_700_000_000 + i * 10_800,
                "main": { "temp": i },
                "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01n" }]
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": list })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn no_credential_never_touches_the_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let env = RuntimeEnv::from_sources(&[&MapEnv::default()]);
    let source = WeatherSource::from_env(&env, Some(server.uri().as_str()));
    let controller = WeatherController::new(source, settings());

    for city in ["London", "São Paulo", "x"] {
        let phase = controller.search(city).await;
        let Phase::Ready(report) = phase else {
            panic!("synthetic search must succeed");
        };
        assert_eq!(report.current.location_name, city);
        assert_eq!(report.forecast.len(), 4);
    }

    controller.on_input("London");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(controller.state().suggestions.is_empty());
}

#[tokio::test]
async fn live_search_truncates_forecast_in_order() {
    let server = MockServer::start().await;
    mount_city(&server, "London", 14.5).await;

    let controller = live_controller(&server);
    let phase = controller.mount("London").await.expect("mount task");

    let Phase::Ready(report) = phase else {
        panic!("expected a report");
    };
    assert_eq!(report.current.display_temperature(), 15);
    let temps: Vec<_> = report.forecast.iter().map(|e| e.temperature_c).collect();
    assert_eq!(temps, vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(controller.state().phase, Phase::Ready(report));
}

#[tokio::test]
async fn failed_forecast_fails_the_whole_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "London",
            "sys": { "country": "GB" },
            "weather": [],
            "main": { "temp": 10.0, "feels_like": 9.0, "humidity": 50, "pressure": 1013 },
            "wind": { "speed": 1.5 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let controller = live_controller(&server);
    let phase = controller.search("London").await;

    assert_eq!(
        phase,
        Phase::Failed(
            "Invalid API key. Please verify your OpenWeatherMap API key is correct.".into()
        )
    );
}

#[tokio::test]
async fn type_then_pick_a_suggestion() {
    let server = MockServer::start().await;
    mount_city(&server, "London", 9.0).await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "London", "country": "GB" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Lon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let controller = live_controller(&server);
    controller.on_input("Lon");
    controller.on_input("London");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = controller.state();
    assert!(state.suggestions_open);
    assert_eq!(state.suggestions.len(), 1);

    let search = controller
        .select_suggestion(&state.suggestions[0])
        .expect("selection starts a search");
    assert_eq!(controller.state().city, "London");
    assert!(controller.state().suggestions.is_empty());

    let phase = search.await.expect("search task");
    assert!(matches!(phase, Phase::Ready(_)));
}

#[tokio::test]
async fn runtime_key_reaches_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("appid", "RUNTIME_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Lima",
            "sys": { "country": "PE" },
            "weather": [{ "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }],
            "main": { "temp": 19.2, "feels_like": 19.0, "humidity": 77, "pressure": 1012 },
            "wind": { "speed": 3.1 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("appid", "RUNTIME_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })))
        .mount(&server)
        .await;

    let runtime: MapEnv = [(API_KEY_VAR, "RUNTIME_KEY")].into_iter().collect();
    let env = RuntimeEnv::from_sources(&[&runtime]);
    let source = WeatherSource::from_env(&env, Some(server.uri().as_str()));
    let controller = WeatherController::new(source, settings());

    let phase = controller.search("Lima").await;

    let Phase::Ready(report) = phase else {
        panic!("a request without the runtime key would have been rejected");
    };
    assert_eq!(report.current.country, "PE");
    assert!(report.forecast.is_empty());
}
