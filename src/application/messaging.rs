use crate::domain::{Account, Profile};

/// Reduces a locally written phone number to bare digits and drops a single
/// leading trunk zero, the form wa.me expects after the country code.
/// "099-123-4567" becomes "991234567".
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// Click-to-chat link with the message body URL-encoded.
pub fn wa_link(country_code: &str, phone: &str, body: &str) -> String {
    format!(
        "https://wa.me/{}{}?text={}",
        country_code,
        normalize_phone(phone),
        urlencoding::encode(body)
    )
}

/// Credentials handed to the client right after their profile is created.
pub fn welcome_message(profile: &Profile, account: &Account) -> String {
    let pin = profile.pin.as_deref().unwrap_or("No asignado");
    format!(
        "🚀GT Tecnology🚀\n\
         Buen día estimad@ {}, ¡Felicitaciones! Tu suscripción mensual de {} 🍿 \
         te brindará entretenimiento ilimitado y satisfacción absoluta. \
         ¡Eres importante para nosotros!, cualquier novedad escríbenos. ✍️\n\
         ✅ CORREO: {}\n\
         ✅ CONTRASEÑA: {}\n\
         Perfil: {}\n\
         Pin: {}\n\
         INDICACIONES PARA EL USUARIO 🙋‍♀️\n\
         =============================\n\
         * NO debe cambiar el nombre de otros perfiles.\n\
         * NO usar más de 1 dispositivo contratado.\n\
         Fecha Activación: {}\n\
         🚀GT Tecnology🚀",
        profile.client_name,
        account.service_name,
        account.login,
        account.account_password,
        profile.profile_name,
        pin,
        profile.start_date.format("%d/%m/%Y"),
    )
}

/// Nudge sent when a profile enters the expiry warning window.
pub fn renewal_reminder(profile: &Profile, account: &Account) -> String {
    format!(
        "¡Hola {}! Te recordamos que tu suscripción a {} con GT Tecnology \
         vence el {}. Renueva ahora y sigue disfrutando de tu entretenimiento \
         sin límites. 🍿",
        profile.client_name,
        account.service_name,
        profile.end_date.format("%d/%m/%Y"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn fixtures() -> (Profile, Account) {
        let account_id = Uuid::new_v4();
        let profile = Profile {
            id: Uuid::new_v4(),
            account_id,
            client_id: Uuid::new_v4(),
            client_name: "Ana Paredes".to_string(),
            profile_name: "ANA".to_string(),
            pin: None,
            phone: "099-123-4567".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap(),
            generates_payment: true,
            price: 4.0,
            created_at: Utc::now(),
        };
        let account = Account {
            id: account_id,
            login: "cuenta@mail.com".to_string(),
            service_id: Uuid::new_v4(),
            service_name: "Netflix Premium".to_string(),
            billing_date: Utc::now(),
            note: String::new(),
            email_password: String::new(),
            account_password: "secreto123".to_string(),
            free_slots: 3,
            occupied_slots: 2,
            version: 0,
            created_at: Utc::now(),
        };
        (profile, account)
    }

    #[test]
    fn normalize_strips_punctuation_and_the_trunk_zero() {
        assert_eq!(normalize_phone("099-123-4567"), "991234567");
        assert_eq!(normalize_phone("(09) 9123 4567"), "991234567");
        assert_eq!(normalize_phone("991234567"), "991234567");
    }

    #[test]
    fn normalize_drops_only_one_leading_zero() {
        assert_eq!(normalize_phone("0099"), "099");
    }

    #[test]
    fn wa_link_has_full_number_and_encoded_body() {
        let link = wa_link("593", "099-123-4567", "Hola, ¿qué tal?");
        assert!(link.starts_with("https://wa.me/593991234567?text="));
        assert!(!link.contains(' '));
        assert!(link.contains("Hola%2C%20%C2%BFqu%C3%A9%20tal%3F"));
    }

    #[test]
    fn welcome_message_carries_credentials_and_activation_date() {
        let (profile, account) = fixtures();
        let body = welcome_message(&profile, &account);
        assert!(body.contains("cuenta@mail.com"));
        assert!(body.contains("secreto123"));
        assert!(body.contains("Perfil: ANA"));
        assert!(body.contains("Pin: No asignado"));
        assert!(body.contains("01/05/2024"));
    }

    #[test]
    fn reminder_names_the_service_and_the_end_date() {
        let (profile, account) = fixtures();
        let body = renewal_reminder(&profile, &account);
        assert!(body.contains("Netflix Premium"));
        assert!(body.contains("31/05/2024"));
        assert!(body.contains("Ana Paredes"));
    }
}
