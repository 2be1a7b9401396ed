use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// 干燥会话 ID（接口中的 `test_id`）
pub type SessionId = i64;

/// 解析接口时间戳
///
/// 支持 RFC 3339 和 `YYYY-MM-DD HH:MM:SS`（按 UTC 处理）两种格式
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// 传感器读数
///
/// 一条读数只属于一个会话，接收后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 所属会话
    #[serde(rename = "test_id")]
    pub session_id: SessionId,

    /// 采样时间
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,

    /// 光照强度
    #[serde(rename = "light", default)]
    pub light_level: f64,

    /// 箱内温度（°C）
    pub temp_in: f64,

    /// 箱外温度（°C）
    pub temp_out: f64,

    /// 箱内湿度（%）
    pub hum_in: f64,

    /// 箱外湿度（%）
    pub hum_out: f64,

    /// 内外温差
    #[serde(default)]
    pub diff_temp: f64,

    /// 内外湿度差
    #[serde(default)]
    pub diff_hum: f64,
}

impl Reading {
    /// 创建读数，传感器数值为零
    pub fn new(session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id,
            timestamp,
            light_level: 0.0,
            temp_in: 0.0,
            temp_out: 0.0,
            hum_in: 0.0,
            hum_out: 0.0,
            diff_temp: 0.0,
            diff_hum: 0.0,
        }
    }

    pub fn with_temperature(mut self, temp_in: f64, temp_out: f64) -> Self {
        self.temp_in = temp_in;
        self.temp_out = temp_out;
        self.diff_temp = temp_in - temp_out;
        self
    }

    pub fn with_humidity(mut self, hum_in: f64, hum_out: f64) -> Self {
        self.hum_in = hum_in;
        self.hum_out = hum_out;
        self.diff_hum = hum_in - hum_out;
        self
    }

    pub fn with_light(mut self, light_level: f64) -> Self {
        self.light_level = light_level;
        self
    }

    /// 预测接口所需的快照
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            temp_in: self.temp_in,
            temp_out: self.temp_out,
            hum_in: self.hum_in,
            hum_out: self.hum_out,
            light: self.light_level,
        }
    }
}

/// 会话最新读数的快照，作为完成时间预测的输入
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub temp_in: f64,
    pub temp_out: f64,
    pub hum_in: f64,
    pub hum_out: f64,
    pub light: f64,
}

impl Snapshot {
    /// 预测接口的查询参数
    pub fn query_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("temp_in", self.temp_in.to_string()),
            ("temp_out", self.temp_out.to_string()),
            ("hum_in", self.hum_in.to_string()),
            ("hum_out", self.hum_out.to_string()),
            ("light", self.light.to_string()),
        ]
    }
}
