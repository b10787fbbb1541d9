use crate::domain::card::Rank;

/// Битовая маска рангов.
///
/// Используем 13 бит (от 2 до A):
/// бит 0 = двойка, бит 12 = туз.
pub type RankMask = u16;

/// Маска колеса A2345.
const WHEEL: RankMask = 0b1_0000_0000_1111;

/// Маска пяти подряд идущих рангов со старшей картой `high`.
const fn run_mask(high: u8) -> RankMask {
    0b1_1111 << (high - 6)
}

/// Получить битовую маску для одного ранга.
pub fn rank_to_bit(rank: Rank) -> RankMask {
    1u16 << ((rank as u8) - 2)
}

/// Найти стрит в битовой маске рангов.
/// Возвращает старшую карту стрита, если он есть.
///
/// Особый случай: wheel (A2345) → возвращаем Rank::Five.
pub fn detect_straight(rank_mask: RankMask) -> Option<Rank> {
    // От бродвея к шестёрке.
    for high in (6u8..=14).rev() {
        let m = run_mask(high);
        if rank_mask & m == m {
            return Rank::from_value(high);
        }
    }
    if rank_mask & WHEEL == WHEEL {
        return Some(Rank::Five);
    }
    None
}
