//! Static French to Chinese vocabulary for marketplace queries.

/// Ordered dictionary: on partial matches the first contained key wins.
const FRENCH_TO_CHINESE_TERMS: &[(&str, &str)] = &[
    // Construction
    ("ciment", "水泥"),
    ("béton", "混凝土"),
    ("brique", "砖"),
    ("carrelage", "瓷砖"),
    ("carreau", "瓷砖"),
    ("parquet", "木地板"),
    ("peinture", "油漆"),
    ("plâtre", "石膏"),
    ("fer", "钢铁"),
    ("acier", "钢"),
    ("aluminium", "铝"),
    ("cuivre", "铜"),
    ("tuyau", "管道"),
    ("tube", "管"),
    ("câble", "电缆"),
    ("fil électrique", "电线"),
    ("interrupteur", "开关"),
    ("prise", "插座"),
    ("robinet", "水龙头"),
    ("lavabo", "洗手盆"),
    ("toilette", "马桶"),
    ("wc", "马桶"),
    ("douche", "淋浴"),
    ("baignoire", "浴缸"),
    ("évier", "水槽"),
    ("fenêtre", "窗户"),
    ("porte", "门"),
    ("serrure", "锁"),
    ("poignée", "把手"),
    ("charnière", "铰链"),
    ("vis", "螺丝"),
    ("clou", "钉子"),
    ("boulon", "螺栓"),
    ("écrou", "螺母"),
    // Electricity and climate
    ("climatiseur", "空调"),
    ("ventilateur", "风扇"),
    ("chauffage", "暖气"),
    ("chauffe-eau", "热水器"),
    ("pompe", "水泵"),
    ("générateur", "发电机"),
    ("groupe électrogène", "柴油发电机"),
    ("panneau solaire", "太阳能板"),
    ("led", "LED灯"),
    ("ampoule", "灯泡"),
    ("lustre", "吊灯"),
    ("projecteur", "投光灯"),
    // Furniture
    ("chaise", "椅子"),
    ("table", "桌子"),
    ("bureau", "办公桌"),
    ("armoire", "衣柜"),
    ("lit", "床"),
    ("matelas", "床垫"),
    ("canapé", "沙发"),
    ("étagère", "架子"),
    // Automotive
    ("voiture", "汽车"),
    ("auto", "汽车"),
    ("clé", "钥匙"),
    ("cle", "钥匙"),
    ("boitier", "外壳"),
    ("boîtier", "外壳"),
    ("télécommande", "遥控器"),
    ("telecommande", "遥控器"),
    ("batterie", "电池"),
    ("pneu", "轮胎"),
    ("roue", "车轮"),
    ("phare", "车灯"),
    ("pare-brise", "挡风玻璃"),
    ("rétroviseur", "后视镜"),
    ("moteur", "发动机"),
    ("frein", "刹车"),
    ("embrayage", "离合器"),
    ("amortisseur", "减震器"),
    ("filtre", "过滤器"),
    ("huile", "机油"),
    ("essence", "汽油"),
    // Electronics
    ("téléphone", "手机"),
    ("telephone", "手机"),
    ("coque", "手机壳"),
    ("écran", "屏幕"),
    ("chargeur", "充电器"),
    ("casque", "耳机"),
    ("ordinateur", "电脑"),
    ("clavier", "键盘"),
    ("souris", "鼠标"),
    ("usb", "USB"),
    ("hdmi", "HDMI"),
    // Clothing and textile
    ("vêtement", "服装"),
    ("tissu", "布料"),
    ("textile", "纺织品"),
    ("coton", "棉"),
    ("soie", "丝绸"),
    ("cuir", "皮革"),
    ("chaussure", "鞋子"),
    ("sac", "包"),
    // General
    ("accessoire", "配件"),
    ("pièce", "零件"),
    ("piece", "零件"),
    ("rechange", "备件"),
    ("plastique", "塑料"),
    ("verre", "玻璃"),
    ("bois", "木材"),
    ("métal", "金属"),
    ("metal", "金属"),
];

/// True when the text contains CJK unified ideographs
pub fn contains_native_script(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

/// Dictionary-based translation of search phrases into the marketplace language
#[derive(Debug, Clone)]
pub struct TermTranslator {
    terms: &'static [(&'static str, &'static str)],
}

impl Default for TermTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl TermTranslator {
    pub fn new() -> Self {
        Self {
            terms: FRENCH_TO_CHINESE_TERMS,
        }
    }

    /// Exact lookup, then first-key substring replacement, then the phrase unchanged
    pub fn translate(&self, phrase: &str) -> String {
        let lower = phrase.trim().to_lowercase();

        if let Some((_, native)) = self.terms.iter().find(|(source, _)| *source == lower) {
            return native.to_string();
        }

        for (source, native) in self.terms {
            if lower.contains(source) {
                return lower.replacen(source, native, 1);
            }
        }

        phrase.to_string()
    }

    /// Keep at most `max_words` words; long descriptions make poor marketplace queries
    pub fn simplify(&self, phrase: &str, max_words: usize) -> String {
        phrase
            .split_whitespace()
            .take(max_words.max(1))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
