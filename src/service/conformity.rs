use crate::models::conformity::{BACK_ORDER, CONFORME, LITIGE, LITIGE_BACK_ORDER, NON_CONTROLE};

/// 根据明细状态推导整单合格状态
///
/// 依次覆盖: 默认 conforme → 有 litige 则 litige → 有 back_order 则 back_order
/// (已是 litige 时合并为 "litige, back_order") → 有 non_controle 则无条件为 non_controle。
/// 其他标签 (如 autre) 不影响结果。
pub fn resolve_conformity<'a, I>(outcomes: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let (mut litige, mut back_order, mut non_controle) = (false, false, false);
    for outcome in outcomes {
        match outcome {
            LITIGE => litige = true,
            BACK_ORDER => back_order = true,
            NON_CONTROLE => non_controle = true,
            _ => {}
        }
    }

    let mut conf = CONFORME;
    if litige {
        conf = LITIGE;
    }
    if back_order {
        conf = if conf == LITIGE { LITIGE_BACK_ORDER } else { BACK_ORDER };
    }
    if non_controle {
        conf = NON_CONTROLE;
    }
    conf
}
