//! Built-in sample locations for quickly filling an empty session.

use crate::config::Locale;
use crate::model::Location;

const ZH: [(&str, &[&str]); 5] = [
    (
        "迷雾港口",
        &[
            "常年笼罩在浓雾中的古老港口，木质码头吱呀作响。",
            "夜里灯塔的光偶尔扫过海面，照出搁浅的残船。",
        ],
    ),
    (
        "翡翠森林",
        &[
            "参天古树遮天蔽日，林间弥漫着淡绿色的微光。",
            "传说森林深处住着不愿见人的精灵。",
        ],
    ),
    (
        "铁砧要塞",
        &[
            "建在山口的石砌要塞，城墙上布满旧日战争的痕迹。",
            "锻造坊的炉火昼夜不熄，铁锤声在山谷间回荡。",
        ],
    ),
    (
        "沉睡图书馆",
        &[
            "被遗忘的地下图书馆，书架一直延伸到黑暗尽头。",
            "某些书页会在无人时自行翻动。",
        ],
    ),
    (
        "落日集市",
        &[
            "黄昏才开张的集市，摊贩来自各个王国。",
            "这里什么都能买到，只要付得起代价。",
        ],
    ),
];

const EN: [(&str, &[&str]); 5] = [
    (
        "Misty Harbor",
        &[
            "An ancient port wrapped in fog, its wooden piers creaking underfoot.",
            "At night the lighthouse beam sweeps the water and catches stranded wrecks.",
        ],
    ),
    (
        "Emerald Forest",
        &[
            "Towering trees block out the sky and a pale green glow hangs between them.",
            "Legend says reclusive elves live deep in the woods.",
        ],
    ),
    (
        "Anvil Keep",
        &[
            "A stone fortress in the mountain pass, its walls scarred by old wars.",
            "The forge fires never go out and hammer blows echo through the valley.",
        ],
    ),
    (
        "Sleeping Library",
        &[
            "A forgotten underground library whose shelves run into the dark.",
            "Some pages turn by themselves when no one is watching.",
        ],
    ),
    (
        "Sunset Bazaar",
        &[
            "A market that only opens at dusk, with traders from every kingdom.",
            "Anything can be bought here, for a price.",
        ],
    ),
];

/// All sample locations for `locale`.
pub fn sample_locations(locale: Locale) -> Vec<Location> {
    let table = match locale {
        Locale::Zh => &ZH,
        Locale::En => &EN,
    };
    table
        .iter()
        .map(|(name, descriptions)| {
            Location::new(
                *name,
                descriptions.iter().map(|d| d.to_string()).collect(),
            )
        })
        .collect()
}
