//! 시나리오 변형과 팩토리
//!
//! | 변형 | 시작 상태 | 실패 이벤트 |
//! |------|-----------|-------------|
//! | [`G3General`] | G3 | IN_S3, IN_S4 |
//! | [`G3DcOn`] | G3 | IN_S3, IN_S4 |
//! | [`G3Surprise`] | G3 | IN_S3, IN_S4 |
//! | [`G3SurpriseDcOn`] | G3 | IN_S3, IN_S4 |
//! | [`S5General`] | S5 | IN_G3, IN_S3, IN_S4 |
//! | [`S3General`] | S3 | IN_G3, IN_S4, IN_S5, IN_UEFI |
//! | [`ResetGeneral`] | OS/UEFI | IN_G3, IN_S3, IN_S4, IN_S5 |
//! | [`ResetUefi2Os`] | OS | IN_G3, IN_S3, IN_S4, IN_S5 |

mod g3;
mod low_power;
mod reset;

use dpmo_core::error::ScenarioError;
use dpmo_core::types::ScenarioKind;

use crate::scenario::Scenario;

pub use g3::{G3DcOn, G3General, G3Surprise, G3SurpriseDcOn};
pub use low_power::{S3General, S5General};
pub use reset::{ResetGeneral, ResetUefi2Os};

/// 변형 종류에 맞는 시나리오를 생성합니다.
pub fn create(kind: ScenarioKind) -> Box<dyn Scenario> {
    match kind {
        ScenarioKind::G3General => Box::new(G3General),
        ScenarioKind::G3DcOn => Box::new(G3DcOn::default()),
        ScenarioKind::G3Surprise => Box::new(G3Surprise),
        ScenarioKind::G3SurpriseDcOn => Box::new(G3SurpriseDcOn::default()),
        ScenarioKind::S5General => Box::new(S5General),
        ScenarioKind::S3General => Box::new(S3General),
        ScenarioKind::ResetGeneral => Box::new(ResetGeneral),
        ScenarioKind::ResetUefi2Os => Box::new(ResetUefi2Os),
    }
}

/// 이름으로 시나리오를 생성합니다. 대소문자를 구분하지 않으며 이전 이름도 받습니다.
///
/// # Errors
///
/// 알 수 없는 이름이면 `ScenarioError::UnknownVariant`.
pub fn create_by_name(name: &str) -> Result<Box<dyn Scenario>, ScenarioError> {
    let kind = name
        .parse::<ScenarioKind>()
        .map_err(|_| ScenarioError::UnknownVariant(name.to_owned()))?;
    Ok(create(kind))
}
