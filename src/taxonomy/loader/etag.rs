use serde::{Deserialize, Serialize};

/// ETag 记录（单个远程源）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ETagRecord {
    /// 远程源 URL
    pub source_url: String,
    /// 远程文件 ETag（已去除 W/ 前缀与引号）
    pub etag: String,
    /// 对应的本地快照路径
    pub snapshot_path: String,
    /// 最后更新时间（秒级时间戳）
    pub last_update: u64,
}

/// ETag 总记录（序列化到本地文件）
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ETagTotalRecord {
    pub records: Vec<ETagRecord>,
}

impl ETagTotalRecord {
    pub fn find_record(&self, source_url: &str) -> Option<&ETagRecord> {
        self.records.iter().find(|r| r.source_url == source_url)
    }

    /// 同一源只保留最新一条
    pub fn upsert_record(&mut self, new_record: ETagRecord) {
        self.records.retain(|r| r.source_url != new_record.source_url);
        self.records.push(new_record);
    }
}

/// 清理 ETag：去掉弱校验前缀与引号
pub fn normalize_etag(raw: &str) -> String {
    raw.trim().trim_start_matches("W/").trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, etag: &str) -> ETagRecord {
        ETagRecord {
            source_url: url.into(),
            etag: etag.into(),
            snapshot_path: "/tmp/x.lz4".into(),
            last_update: 0,
        }
    }

    #[test]
    fn test_upsert_replaces_same_source() {
        let mut total = ETagTotalRecord::default();
        total.upsert_record(record("a", "1"));
        total.upsert_record(record("b", "1"));
        total.upsert_record(record("a", "2"));
        assert_eq!(total.records.len(), 2);
        assert_eq!(total.find_record("a").unwrap().etag, "2");
    }

    #[test]
    fn test_normalize_weak_etag() {
        assert_eq!(normalize_etag("W/\"abc-123\""), "abc-123");
        assert_eq!(normalize_etag("\"xyz\""), "xyz");
    }
}
