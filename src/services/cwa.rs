use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const EARTHQUAKE_FALLBACK_TEXT: &str = "找不到地震資訊";
pub const EARTHQUAKE_FALLBACK_IMAGE: &str = "https://example.com/demo.jpg";
pub const WEATHER_FALLBACK: &str = "找不到氣象資訊";

const LOCAL_EARTHQUAKES: &str = "E-A0016-001";
const SIGNIFICANT_EARTHQUAKES: &str = "E-A0015-001";
const OBSERVATIONS: [&str; 2] = ["O-A0001-001", "O-A0003-001"];
const FORECAST_ELEMENT: &str = "WeatherDescription";
const FORECAST_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
// CWA reports missing observation values as -99
const MISSING_VALUE: &str = "-99";

/// Two-day township forecast datasets, one per county.
const FORECAST_DATASETS: [(&str, &str); 22] = [
    ("宜蘭縣", "F-D0047-001"),
    ("桃園市", "F-D0047-005"),
    ("新竹縣", "F-D0047-009"),
    ("苗栗縣", "F-D0047-013"),
    ("彰化縣", "F-D0047-017"),
    ("南投縣", "F-D0047-021"),
    ("雲林縣", "F-D0047-025"),
    ("嘉義縣", "F-D0047-029"),
    ("屏東縣", "F-D0047-033"),
    ("臺東縣", "F-D0047-037"),
    ("花蓮縣", "F-D0047-041"),
    ("澎湖縣", "F-D0047-045"),
    ("基隆市", "F-D0047-049"),
    ("新竹市", "F-D0047-053"),
    ("嘉義市", "F-D0047-057"),
    ("臺北市", "F-D0047-061"),
    ("高雄市", "F-D0047-065"),
    ("新北市", "F-D0047-069"),
    ("臺中市", "F-D0047-073"),
    ("臺南市", "F-D0047-077"),
    ("連江縣", "F-D0047-081"),
    ("金門縣", "F-D0047-085"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeReport {
    pub text: String,
    pub image_url: String,
}

impl EarthquakeReport {
    pub fn fallback() -> Self {
        Self {
            text: EARTHQUAKE_FALLBACK_TEXT.to_owned(),
            image_url: EARTHQUAKE_FALLBACK_IMAGE.to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct CwaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CwaClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    /// Latest earthquake report, falling back to a placeholder on any failure.
    pub async fn earthquake(&self) -> EarthquakeReport {
        let (local, significant) = tokio::join!(
            self.latest_earthquake(LOCAL_EARTHQUAKES),
            self.latest_earthquake(SIGNIFICANT_EARTHQUAKES)
        );

        let latest = match (local, significant) {
            (Ok(a), Ok(b)) => Some(if b.origin_time() > a.origin_time() { b } else { a }),
            (Ok(report), Err(err)) | (Err(err), Ok(report)) => {
                warn!("Could not fetch one of the earthquake datasets: {err:#}");
                Some(report)
            }
            (Err(err), Err(_)) => {
                warn!("Could not fetch earthquake reports: {err:#}");
                None
            }
        };

        latest.map_or_else(EarthquakeReport::fallback, |report| EarthquakeReport {
            text: report.to_text(),
            image_url: report.image_url,
        })
    }

    /// Current conditions and the three hour forecast for the town in `address`.
    pub async fn weather(&self, address: &str) -> String {
        let address = normalize_address(address);

        let mut towns = self.observations().await;

        match forecast_dataset(&address) {
            Some(dataset) => match self.forecast(dataset).await {
                Ok(forecasts) => {
                    for (town, note) in forecasts {
                        let entry = towns.entry(town).or_default();
                        if !entry.is_empty() {
                            entry.push_str("\n\n");
                        }
                        entry.push_str("未來三小時");
                        entry.push_str(&note);
                    }
                }
                Err(err) => warn!("Could not fetch forecast {dataset}: {err:#}"),
            },
            None => debug!("No forecast dataset for address {address}"),
        }

        towns
            .into_iter()
            .find(|(town, _)| address.contains(town.as_str()))
            .map_or_else(|| WEATHER_FALLBACK.to_owned(), |(_, text)| text)
    }

    async fn latest_earthquake(&self, dataset: &str) -> anyhow::Result<Earthquake> {
        let response: Response<EarthquakeRecords> = self.get(dataset, &[]).await?;
        response
            .records
            .earthquake
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{dataset} contains no reports"))
    }

    /// Current conditions keyed by county and town, first station wins.
    async fn observations(&self) -> BTreeMap<String, String> {
        let [automatic, manned] = OBSERVATIONS;
        let (first, second) = tokio::join!(self.stations(automatic), self.stations(manned));
        let mut towns = BTreeMap::new();

        for (dataset, result) in [(automatic, first), (manned, second)] {
            let stations = match result {
                Ok(stations) => stations,
                Err(err) => {
                    warn!("Could not fetch observations {dataset}: {err:#}");
                    continue;
                }
            };
            for station in stations {
                let elements = &station.weather_element;
                if elements.weather.is_empty() || elements.weather == MISSING_VALUE {
                    continue;
                }

                let town = format!(
                    "{}{}",
                    station.geo_info.county_name, station.geo_info.town_name
                );
                towns.entry(town).or_insert_with(|| {
                    format!(
                        "目前天氣狀況「{}」，溫度 {:.1} 度，相對濕度 {:.1}%！",
                        elements.weather, elements.air_temperature, elements.relative_humidity
                    )
                });
            }
        }

        towns
    }

    async fn stations(&self, dataset: &str) -> anyhow::Result<Vec<Station>> {
        let response: Response<StationRecords> = self.get(dataset, &[]).await?;
        Ok(response.records.station)
    }

    async fn forecast(&self, dataset: &str) -> anyhow::Result<Vec<(String, String)>> {
        let (time_from, time_to) = forecast_window(Utc::now());
        let response: Response<ForecastRecords> = self
            .get(
                dataset,
                &[
                    ("elementName", FORECAST_ELEMENT),
                    ("timeFrom", time_from.as_str()),
                    ("timeTo", time_to.as_str()),
                ],
            )
            .await?;

        let county = response
            .records
            .locations
            .into_iter()
            .next()
            .context("forecast contains no locations")?;

        Ok(county
            .location
            .into_iter()
            .filter_map(|town| {
                let note = town
                    .weather_element
                    .into_iter()
                    .next()?
                    .time
                    .into_iter()
                    .next()?
                    .element_value
                    .into_iter()
                    .next()?
                    .value;
                Some((format!("{}{}", county.locations_name, town.location_name), note))
            })
            .collect())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        dataset: &str,
        params: &[(&str, &str)],
    ) -> anyhow::Result<Response<T>> {
        let api_key = self.api_key.as_deref().context("CWA API key is not configured")?;

        debug!("Requesting CWA dataset {dataset}");
        let response = self
            .http
            .get(format!("{}/{dataset}", self.base_url))
            .query(&[("Authorization", api_key)])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Could not parse dataset {dataset}"))?;

        Ok(response)
    }
}

/// CWA spells county names with the traditional 臺.
pub fn normalize_address(address: &str) -> String {
    address.replace('台', "臺")
}

fn forecast_dataset(address: &str) -> Option<&'static str> {
    FORECAST_DATASETS
        .iter()
        .find(|(county, _)| address.contains(county))
        .map(|(_, dataset)| *dataset)
}

fn forecast_window(now: DateTime<Utc>) -> (String, String) {
    let taipei = FixedOffset::east_opt(8 * 3600).expect("valid offset");
    let from = now.with_timezone(&taipei);
    let to = from + Duration::hours(3);

    (
        from.format(FORECAST_TIME_FORMAT).to_string(),
        to.format(FORECAST_TIME_FORMAT).to_string(),
    )
}

#[derive(Deserialize)]
struct Response<T> {
    records: T,
}

#[derive(Deserialize)]
struct EarthquakeRecords {
    #[serde(rename = "Earthquake", default)]
    earthquake: Vec<Earthquake>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct Earthquake {
    #[serde(rename = "ReportImageURI")]
    image_url: String,
    earthquake_info: EarthquakeInfo,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct EarthquakeInfo {
    origin_time: String,
    focal_depth: f64,
    epicenter: Epicenter,
    earthquake_magnitude: EarthquakeMagnitude,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct Epicenter {
    location: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct EarthquakeMagnitude {
    magnitude_value: f64,
}

impl Earthquake {
    // Both datasets use "%Y-%m-%d %H:%M:%S", which orders lexically
    fn origin_time(&self) -> &str {
        &self.earthquake_info.origin_time
    }

    fn to_text(&self) -> String {
        let info = &self.earthquake_info;
        format!(
            "{}，芮氏規模 {:.1} 級，深度 {:.1} 公里，發生時間 {}。",
            info.epicenter.location,
            info.earthquake_magnitude.magnitude_value,
            info.focal_depth,
            info.origin_time
        )
    }
}

#[derive(Deserialize)]
struct StationRecords {
    #[serde(rename = "Station", default)]
    station: Vec<Station>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Station {
    geo_info: GeoInfo,
    weather_element: StationWeather,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeoInfo {
    county_name: String,
    town_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StationWeather {
    #[serde(default)]
    weather: String,
    air_temperature: f64,
    relative_humidity: f64,
}

#[derive(Deserialize)]
struct ForecastRecords {
    #[serde(default)]
    locations: Vec<ForecastCounty>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastCounty {
    locations_name: String,
    location: Vec<ForecastTown>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastTown {
    location_name: String,
    weather_element: Vec<ForecastElement>,
}

#[derive(Deserialize)]
struct ForecastElement {
    time: Vec<ForecastTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastTime {
    element_value: Vec<ElementValue>,
}

#[derive(Deserialize)]
struct ElementValue {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::{
        forecast_dataset, forecast_window, normalize_address, CwaClient, EarthquakeReport,
        WEATHER_FALLBACK,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn earthquake_body(location: &str, time: &str, image: &str) -> Value {
        json!({
            "success": "true",
            "records": {
                "datasetDescription": "地震報告",
                "Earthquake": [{
                    "EarthquakeNo": 113000,
                    "ReportImageURI": image,
                    "EarthquakeInfo": {
                        "OriginTime": time,
                        "Source": "中央氣象署",
                        "FocalDepth": 15.5,
                        "Epicenter": {"Location": location, "EpicenterLatitude": 23.77, "EpicenterLongitude": 121.67},
                        "EarthquakeMagnitude": {"MagnitudeType": "芮氏規模", "MagnitudeValue": 4.2}
                    }
                }]
            }
        })
    }

    fn station(county: &str, town: &str, weather: &str, temperature: f64, humidity: f64) -> Value {
        json!({
            "StationName": "測站",
            "GeoInfo": {"CountyName": county, "TownName": town},
            "WeatherElement": {"Weather": weather, "AirTemperature": temperature, "RelativeHumidity": humidity}
        })
    }

    async fn mount_json(server: &MockServer, dataset: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{dataset}")))
            .and(query_param("Authorization", "cwa-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> CwaClient {
        CwaClient::new(reqwest::Client::new(), &server.uri(), Some("cwa-key".to_owned()))
    }

    #[tokio::test]
    async fn earthquake_picks_newest_report() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "E-A0016-001",
            earthquake_body("花蓮縣政府南南東方 25.0 公里", "2024-04-03 07:58:09", "https://cwa/local.png"),
        )
        .await;
        mount_json(
            &server,
            "E-A0015-001",
            earthquake_body("臺東縣政府北方 10.0 公里", "2024-03-30 11:02:00", "https://cwa/big.png"),
        )
        .await;

        let report = client(&server).earthquake().await;
        assert_eq!(
            report,
            EarthquakeReport {
                text: "花蓮縣政府南南東方 25.0 公里，芮氏規模 4.2 級，深度 15.5 公里，發生時間 2024-04-03 07:58:09。".to_owned(),
                image_url: "https://cwa/local.png".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn earthquake_numbers_keep_one_decimal() {
        let server = MockServer::start().await;
        let mut body = earthquake_body("宜蘭縣政府東方 30.0 公里", "2024-05-01 08:00:00", "https://cwa/local.png");
        let info = &mut body["records"]["Earthquake"][0]["EarthquakeInfo"];
        info["FocalDepth"] = json!(10);
        info["EarthquakeMagnitude"]["MagnitudeValue"] = json!(5.0);
        mount_json(&server, "E-A0016-001", body).await;
        Mock::given(method("GET"))
            .and(path("/E-A0015-001"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let report = client(&server).earthquake().await;
        assert_eq!(
            report.text,
            "宜蘭縣政府東方 30.0 公里，芮氏規模 5.0 級，深度 10.0 公里，發生時間 2024-05-01 08:00:00。"
        );
    }

    #[tokio::test]
    async fn earthquake_survives_one_failing_dataset() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "E-A0015-001",
            earthquake_body("臺東縣政府北方 10.0 公里", "2024-03-30 11:02:00", "https://cwa/big.png"),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/E-A0016-001"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let report = client(&server).earthquake().await;
        assert_eq!(report.image_url, "https://cwa/big.png");
    }

    #[tokio::test]
    async fn earthquake_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        assert_eq!(client(&server).earthquake().await, EarthquakeReport::fallback());
    }

    #[tokio::test]
    async fn earthquake_without_key_falls_back() {
        let server = MockServer::start().await;
        let client = CwaClient::new(reqwest::Client::new(), &server.uri(), None);

        assert_eq!(client.earthquake().await, EarthquakeReport::fallback());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_combines_observation_and_forecast() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "O-A0001-001",
            json!({"records": {"Station": [
                station("臺北市", "中正區", "多雲", 28.3, 70.0),
                station("臺北市", "中正區", "晴", 30.0, 50.0),
            ]}}),
        )
        .await;
        mount_json(
            &server,
            "O-A0003-001",
            json!({"records": {"Station": [station("臺北市", "大安區", "-99", -99.0, -99.0)]}}),
        )
        .await;
        mount_json(
            &server,
            "F-D0047-061",
            json!({"records": {"locations": [{
                "datasetDescription": "臺灣各鄉鎮市區預報資料",
                "locationsName": "臺北市",
                "location": [
                    {"locationName": "中正區", "weatherElement": [{"elementName": "WeatherDescription", "time": [
                        {"startTime": "2024-05-01 12:00:00", "endTime": "2024-05-01 15:00:00",
                         "elementValue": [{"value": "多雲。降雨機率 20%。", "measures": "NA"}]}
                    ]}]},
                    {"locationName": "大安區", "weatherElement": [{"elementName": "WeatherDescription", "time": [
                        {"startTime": "2024-05-01 12:00:00", "endTime": "2024-05-01 15:00:00",
                         "elementValue": [{"value": "晴。降雨機率 0%。", "measures": "NA"}]}
                    ]}]}
                ]
            }]}}),
        )
        .await;

        let client = client(&server);
        assert_eq!(
            client.weather("100台灣台北市中正區重慶南路一段122號").await,
            "目前天氣狀況「多雲」，溫度 28.3 度，相對濕度 70.0%！\n\n未來三小時多雲。降雨機率 20%。"
        );
        assert_eq!(
            client.weather("106台北市大安區羅斯福路四段1號").await,
            "未來三小時晴。降雨機率 0%。"
        );
    }

    #[tokio::test]
    async fn weather_survives_one_failing_observation_dataset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/O-A0001-001"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_json(
            &server,
            "O-A0003-001",
            json!({"records": {"Station": [station("花蓮縣", "花蓮市", "陰", 24.0, 88.5)]}}),
        )
        .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).weather("970花蓮縣花蓮市中山路1號").await,
            "目前天氣狀況「陰」，溫度 24.0 度，相對濕度 88.5%！"
        );
    }

    #[tokio::test]
    async fn automatic_stations_win_over_manned_ones() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "O-A0001-001",
            json!({"records": {"Station": [station("臺中市", "西區", "晴", 29.0, 55.0)]}}),
        )
        .await;
        mount_json(
            &server,
            "O-A0003-001",
            json!({"records": {"Station": [station("臺中市", "西區", "雨", 22.0, 95.0)]}}),
        )
        .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).weather("403台中市西區").await,
            "目前天氣狀況「晴」，溫度 29.0 度，相對濕度 55.0%！"
        );
    }

    #[tokio::test]
    async fn weather_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.weather("臺北市中正區").await, WEATHER_FALLBACK);
        assert_eq!(client.weather("somewhere else").await, WEATHER_FALLBACK);
    }

    #[test]
    fn address_helpers() {
        assert_eq!(normalize_address("台南市東區"), "臺南市東區");
        assert_eq!(forecast_dataset("臺南市東區"), Some("F-D0047-077"));
        assert_eq!(forecast_dataset("新竹市東區"), Some("F-D0047-053"));
        assert_eq!(forecast_dataset("Tokyo"), None);
    }

    #[test]
    fn forecast_window_uses_taipei_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 30, 0).unwrap();
        assert_eq!(
            forecast_window(now),
            ("2024-05-01T12:30:00".to_owned(), "2024-05-01T15:30:00".to_owned())
        );
    }
}
