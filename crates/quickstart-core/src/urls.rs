use url::Url;

/// Build an absolute URL for `path` on `host` (which may carry a port).
///
/// Hosts containing `secure_host_suffix` are served over https; everything else
/// (local dev servers) gets plain http.
pub fn full_url(host: &str, path: &str, secure_host_suffix: &str) -> String {
    let scheme = if is_secure_host(host, secure_host_suffix) {
        "https"
    } else {
        "http"
    };

    match Url::parse(&format!("{scheme}://{host}")) {
        Ok(mut url) => {
            url.set_path(path);
            url.to_string()
        }
        Err(_) => format!("{scheme}://{host}{path}"),
    }
}

/// Join `path` onto a configured public base URL, ignoring the request host.
pub fn public_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

pub fn is_secure_host(host: &str, secure_host_suffix: &str) -> bool {
    !secure_host_suffix.is_empty() && host.contains(secure_host_suffix)
}

/// Application-scoped user id: the first label of the OAuth client id joined with
/// the provider's subject id, so ids from different deployments never collide.
pub fn user_id_for(client_id: &str, subject_id: &str) -> String {
    let prefix = client_id.split('.').next().unwrap_or(client_id);
    format!("{prefix}_{subject_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_hosts_get_https() {
        assert_eq!(
            full_url("quickstart.appspot.com", "/notify", "appspot.com"),
            "https://quickstart.appspot.com/notify"
        );
    }

    #[test]
    fn local_hosts_get_http_and_keep_port() {
        assert_eq!(
            full_url("localhost:8080", "/oauth2callback", "appspot.com"),
            "http://localhost:8080/oauth2callback"
        );
    }

    #[test]
    fn empty_suffix_never_matches() {
        assert!(!is_secure_host("example.com", ""));
    }

    #[test]
    fn public_url_avoids_double_slash() {
        assert_eq!(public_url("https://demo.example/", "/notify"), "https://demo.example/notify");
    }

    #[test]
    fn user_id_uses_first_client_id_label() {
        assert_eq!(
            user_id_for("1234.apps.googleusercontent.com", "987"),
            "1234_987"
        );
        assert_eq!(user_id_for("plain", "1"), "plain_1");
    }
}
