//! Player-facing status copy.

use shared::error::ServiceFailure;

pub const ENTER_CODE: &str = "고유번호를 입력해주세요.";
pub const REQUESTING: &str = "서버에 요청 중...";
pub const LOGIN_FIRST: &str = "먼저 로그인해주세요.";
pub const ROLLING: &str = "두구두구...결과는";

pub const LOGIN_FAILED: &str =
    "로그인 중 알 수 없는 오류가 발생했습니다. 개발자 도구 콘솔을 확인해주세요.";
pub const ROLL_FAILED: &str =
    "주사위 굴리기 중 알 수 없는 오류가 발생했습니다. 개발자 도구 콘솔을 확인해주세요.";
pub const ADD_CHANCE_FAILED: &str =
    "기회 추가 중 알 수 없는 오류가 발생했습니다. 개발자 도구 콘솔을 확인해주세요.";

pub fn greeting(name: &str, chances: u32) -> String {
    format!("안녕하세요, {name}님! \n{chances}번의 기회가 있어요.")
}

pub fn no_chances_left(name: &str) -> String {
    format!("{name}님, 남은 기회가 없어요.")
}

pub fn remaining(chances: u32) -> String {
    format!("남은 기회: {chances}회")
}

pub fn chance_added(name: &str) -> String {
    format!("{name}님, 기회가 추가되었습니다!")
}

/// Service rejections are shown as sent; transport failures fall back to
/// the operation's generic text.
pub fn failure(failure: &ServiceFailure, fallback: &str) -> String {
    match failure {
        ServiceFailure::Rejected(message) => message.clone(),
        ServiceFailure::Transport(_) => fallback.to_string(),
    }
}
