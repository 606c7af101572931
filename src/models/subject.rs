use phf::phf_map;

use crate::error::ConfigError;

/// FIPI 题库根地址
pub const FIPI_BANK_ROOT: &str = "https://ege.fipi.ru/bank";

/// 科目枚举（ЕГЭ 开放题库）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// 数学（基础）
    Math,
    /// 数学（专业）
    ProMath,
    /// 信息学
    Inf,
    /// 俄语
    Rus,
    /// 物理
    Phis,
    /// 化学
    Him,
    /// 生物
    Bio,
    /// 历史
    Hist,
    /// 社会学
    Soc,
    /// 文学
    Lit,
    /// 地理
    Geo,
    /// 英语
    Eng,
    /// 德语
    Ger,
    /// 法语
    Fra,
    /// 西班牙语
    Esp,
    /// 汉语
    Chi,
}

static ALIASES: phf::Map<&'static str, Subject> = phf_map! {
    "math" => Subject::Math,
    "promath" => Subject::ProMath,
    "inf" => Subject::Inf,
    "rus" => Subject::Rus,
    "phis" => Subject::Phis,
    "him" => Subject::Him,
    "bio" => Subject::Bio,
    "hist" => Subject::Hist,
    "soc" => Subject::Soc,
    "lit" => Subject::Lit,
    "geo" => Subject::Geo,
    "eng" => Subject::Eng,
    "ger" => Subject::Ger,
    "fra" => Subject::Fra,
    "esp" => Subject::Esp,
    "chi" => Subject::Chi,
};

impl Subject {
    /// 全部科目（按题库目录顺序）
    pub fn all() -> [Subject; 16] {
        [
            Subject::Math,
            Subject::ProMath,
            Subject::Inf,
            Subject::Rus,
            Subject::Phis,
            Subject::Him,
            Subject::Bio,
            Subject::Hist,
            Subject::Soc,
            Subject::Lit,
            Subject::Geo,
            Subject::Eng,
            Subject::Ger,
            Subject::Fra,
            Subject::Esp,
            Subject::Chi,
        ]
    }

    /// 内部简称，用于目录名和记录 ID
    pub fn alias(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::ProMath => "promath",
            Subject::Inf => "inf",
            Subject::Rus => "rus",
            Subject::Phis => "phis",
            Subject::Him => "him",
            Subject::Bio => "bio",
            Subject::Hist => "hist",
            Subject::Soc => "soc",
            Subject::Lit => "lit",
            Subject::Geo => "geo",
            Subject::Eng => "eng",
            Subject::Ger => "ger",
            Subject::Fra => "fra",
            Subject::Esp => "esp",
            Subject::Chi => "chi",
        }
    }

    /// 题库上的官方名称
    pub fn official_name(self) -> &'static str {
        match self {
            Subject::Math => "Математика. Базовый уровень",
            Subject::ProMath => "Математика. Профильный уровень",
            Subject::Inf => "Информатика и ИКТ",
            Subject::Rus => "Русский язык",
            Subject::Phis => "Физика",
            Subject::Him => "Химия",
            Subject::Bio => "Биология",
            Subject::Hist => "История",
            Subject::Soc => "Обществознание",
            Subject::Lit => "Литература",
            Subject::Geo => "География",
            Subject::Eng => "Английский язык",
            Subject::Ger => "Немецкий язык",
            Subject::Fra => "Французский язык",
            Subject::Esp => "Испанский язык",
            Subject::Chi => "Китайский язык",
        }
    }

    /// FIPI 项目 ID
    pub fn proj_id(self) -> &'static str {
        match self {
            Subject::Math => "E040A72A1A3DABA14C90C97E0B6EE7DC",
            Subject::ProMath => "AC437B34557F88EA4115D2F374B0A07B",
            Subject::Inf => "B9ACA5BBB2E19E434CD6BEC25284C67F",
            Subject::Rus => "AF0ED3F2557F8FFC4C06F80B6803FD26",
            Subject::Phis => "BA1F39653304A5B041B656915DC36B38",
            Subject::Him => "5BAC840990A3AF0A4EE80D1B5A1F9527",
            Subject::Bio => "CA9D848A31849ED149D382C32A7A2BE4",
            Subject::Hist => "068A227D253BA6C04D0C832387FD0D89",
            Subject::Soc => "756DF168F63F9A6341711C61AA5EC578",
            Subject::Lit => "4F431E63B9C9B25246F00AD7B5253996",
            Subject::Geo => "20E79180061DB32845C11FC7BD87C7C8",
            Subject::Eng => "4B53A6CB75B0B5E1427E596EB4931A2A",
            Subject::Ger => "B5963A8D84CF9020461EAE42F37F541F",
            Subject::Fra => "5BAC840990A3AF0A4EE80D1B5A1F9527",
            Subject::Esp => "8C65A335D93D9DA047C42613F61416F3",
            Subject::Chi => "F6298F3470D898D043E18BC680F60434",
        }
    }

    /// 题库首页地址
    pub fn base_url(self) -> String {
        format!("{}/index.php?proj={}", FIPI_BANK_ROOT, self.proj_id())
    }

    /// 题目列表页地址
    pub fn questions_url(self) -> String {
        format!("{}/questions.php?proj={}", FIPI_BANK_ROOT, self.proj_id())
    }

    /// 第 `page_number` 页（从 1 开始）的地址，站点使用从 0 开始的 page 参数
    pub fn page_url(self, page_number: u32) -> String {
        format!("{}&page={}", self.base_url(), page_number.saturating_sub(1))
    }

    /// 按简称查找
    pub fn from_alias(alias: &str) -> Option<Self> {
        ALIASES.get(alias).copied()
    }

    /// 按官方名称查找
    pub fn from_official_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|s| s.official_name() == name.trim())
    }

    /// 智能查找科目（简称或名称，不区分大小写）
    pub fn find(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        if let Some(subject) = Self::from_alias(&needle) {
            return Some(subject);
        }
        Self::all()
            .into_iter()
            .find(|subject| subject.official_name().to_lowercase() == needle)
    }

    /// 解析命令行输入，未知时返回配置错误
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Self::find(s).ok_or_else(|| ConfigError::UnknownSubject {
            input: s.to_string(),
        })
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.official_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_roundtrip() {
        for subject in Subject::all() {
            assert_eq!(Subject::from_alias(subject.alias()), Some(subject));
            assert_eq!(Subject::from_official_name(subject.official_name()), Some(subject));
        }
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(Subject::find("MATH"), Some(Subject::Math));
        assert_eq!(Subject::find("информатика и икт"), Some(Subject::Inf));
        assert_eq!(Subject::find("astronomy"), None);
        assert!(Subject::parse("astronomy").is_err());
    }

    #[test]
    fn test_urls() {
        let math = Subject::Math;
        assert_eq!(
            math.base_url(),
            "https://ege.fipi.ru/bank/index.php?proj=E040A72A1A3DABA14C90C97E0B6EE7DC"
        );
        assert!(math.questions_url().contains("questions.php?proj="));
        assert!(math.page_url(1).ends_with("&page=0"));
        assert!(math.page_url(4).ends_with("&page=3"));
    }

    #[test]
    fn test_proj_ids_are_hex() {
        for subject in Subject::all() {
            assert_eq!(subject.proj_id().len(), 32);
            assert!(subject.proj_id().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
